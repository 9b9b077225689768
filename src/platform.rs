use std::path::PathBuf;

#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
    non_empty_env("USERPROFILE").or_else(|| {
        let drive = non_empty_env("HOMEDRIVE")?;
        let path = non_empty_env("HOMEPATH")?;
        Some(PathBuf::from(format!("{}{}", drive.display(), path.display())))
    })
}

#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
    non_empty_env("HOME")
}

#[cfg(windows)]
pub fn default_config_path() -> PathBuf {
    std::env::var("APPDATA")
        .map(|root| PathBuf::from(format!("{}\\nostr-note\\config.json", root)))
        .unwrap_or_else(|_| PathBuf::from(".\\config.json"))
}

#[cfg(not(windows))]
pub fn default_config_path() -> PathBuf {
    match std::env::var("XDG_CONFIG_HOME") {
        Ok(root) if !root.trim().is_empty() => PathBuf::from(root).join("nostr-note").join("config.json"),
        _ => home_dir()
            .map(|h| h.join(".config").join("nostr-note").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("./config.json")),
    }
}

fn non_empty_env(key: &str) -> Option<PathBuf> {
    match std::env::var_os(key) {
        Some(v) if !v.is_empty() => Some(PathBuf::from(v)),
        _ => None,
    }
}
