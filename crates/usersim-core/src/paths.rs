use std::path::{Path, PathBuf};

pub const ROSTER_FILE: &str = "generated_users.jsonl";
pub const CONFIG_FILE: &str = "usersim.yaml";

/// `//User{i}`: top-level simulation actors.
pub fn user_uri(index: usize) -> String {
    format!("//User{index}")
}

/// `{base}/Child/{i}`: accounts produced by `GenerateChildUsers`.
pub fn child_uri(base_seed: &str, index: usize) -> String {
    format!("{base_seed}/Child/{index}")
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}
