pub fn is_truthy(value: impl AsRef<str>) -> bool {
    matches!(
        value.as_ref().trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn is_falsy(value: impl AsRef<str>) -> bool {
    matches!(
        value.as_ref().trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

pub fn read_env_u64(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
}

pub fn read_env_flag(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    if is_truthy(&raw) {
        return Some(true);
    }
    if is_falsy(&raw) {
        return Some(false);
    }
    None
}
