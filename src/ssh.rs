pub fn ssh_target(user: &str, hostname: &str) -> String {
    format!("{}@{}", user, hostname)
}

/// Strips the `<user>@` prefix from an ssh target, if present.
pub fn target_hostname(target: &str) -> &str {
    target
        .split_once('@')
        .map_or(target, |(_, hostname)| hostname)
}
