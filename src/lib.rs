//! Expose every command-line flag as an environment variable.
//!
//! Each flag `name` under a prefix `P` is read from `P_NAME`, where the flag
//! name is converted to SCREAMING_SNAKE_CASE on its case boundaries
//! (`tlsCert` becomes `P_TLS_CERT`). A variable only fills in flags the user
//! did not pass on the command line, and each flag's help text gains a
//! ` [P_NAME]` note.
//!
//! ```
//! use flagenv::{bind_with, FlagSet};
//! use std::collections::HashMap;
//!
//! let mut flags = FlagSet::new("myapp");
//! flags.string("tlsCert", "", "TLS Certificate");
//!
//! let env = HashMap::from([(String::from("MYAPP_TLS_CERT"), String::from("foo.crt"))]);
//! bind_with("MYAPP", &mut flags, &env).unwrap();
//!
//! assert_eq!(flags.get_str("tlsCert"), Some("foo.crt"));
//! assert_eq!(flags.usage("tlsCert"), Some("TLS Certificate [MYAPP_TLS_CERT]"));
//! ```

mod bind;
mod command;
mod env;
mod error;
mod flagset;
mod name;
mod registry;

pub use bind::{bind, bind_with};
pub use command::{bind_command, parse_with_env, CommandRegistry};
pub use env::{Environment, ProcessEnv};
pub use error::{Error, Result};
pub use flagset::{FlagSet, FlagValue};
pub use name::format_name;
pub use registry::FlagRegistry;
