/// Build the environment variable name for a flag identifier.
///
/// The identifier is split on case boundaries and upper-cased, so `tlsCert`
/// under the prefix `MYAPP` becomes `MYAPP_TLS_CERT` and `HTTPPort` under
/// `APP` becomes `APP_HTTP_PORT`. Every character that is not a letter,
/// digits included, is written as `_`.
pub fn format_name(prefix: &str, identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();

    let mut out = String::with_capacity(prefix.len() + identifier.len() * 2 + 1);
    out.push_str(prefix);
    out.push('_');

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphabetic() {
            out.push('_');
            continue;
        }

        if i > 0 && c.is_uppercase() {
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_is_lower = chars[i - 1].is_lowercase();
            if next_is_lower || prev_is_lower {
                out.push('_');
            }
        }

        out.extend(c.to_uppercase());
    }

    out
}
