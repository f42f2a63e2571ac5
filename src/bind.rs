use log::{debug, info, trace};

use crate::env::{lookup, Environment, ProcessEnv};
use crate::error::Result;
use crate::name::format_name;
use crate::registry::FlagRegistry;

/// Expose every flag in `registry` as a `PREFIX_FLAG_NAME` environment
/// variable, reading values from the process environment.
///
/// See [`bind_with`] for the precedence rules.
pub fn bind<R>(prefix: &str, registry: &mut R) -> Result<()>
where
    R: FlagRegistry + ?Sized,
{
    bind_with(prefix, registry, &ProcessEnv)
}

/// Expose every flag in `registry` as a `PREFIX_FLAG_NAME` variable of `env`.
///
/// A flag that was not given on the command line takes the variable's value
/// when the variable is set and non-empty. Flags given on the command line
/// always keep their value. Every flag gets ` [PREFIX_FLAG_NAME]` appended to
/// its usage text, on each call.
///
/// The first assignment error from the registry is returned as is, and the
/// remaining flags are left untouched.
pub fn bind_with<R, E>(prefix: &str, registry: &mut R, env: &E) -> Result<()>
where
    R: FlagRegistry + ?Sized,
    E: Environment + ?Sized,
{
    // Taken before any assignment so values set here never count as explicit
    let explicit = registry.explicitly_set();
    let mut applied = 0usize;

    for name in registry.flag_names() {
        let env_var = format_name(prefix, &name);
        debug!("Flag {} maps to {}", name, env_var);

        if let Some(val) = lookup(env, &env_var) {
            if explicit.contains(&name) {
                trace!("Flag {} set on the command line, ignoring {}", name, env_var);
            } else {
                debug!("Setting flag {} from {}", name, env_var);
                registry.set_value(&name, &val)?;
                applied += 1;
            }
        }

        registry.append_usage(&name, &format!(" [{}]", env_var));
    }

    info!("Applied {} flag value(s) from {}_* variables", applied, prefix);
    Ok(())
}
