/// Derive a project label from a Claude project directory name.
/// Claude encodes the working directory by replacing every `/` (and `.`) with `-`,
/// so `/home/me/workspace/app` is stored as `-home-me-workspace-app`.
pub fn project_label(dir_name: &str) -> String {
    let home = std::env::var("HOME").unwrap_or_default();
    project_label_with_home(dir_name, &home)
}

pub fn project_label_with_home(dir_name: &str, home: &str) -> String {
    if dir_name.is_empty() {
        return "unknown".into();
    }

    let encoded_home = encode_path(home);
    let rel = if !home.is_empty() {
        match dir_name.strip_prefix(&encoded_home) {
            Some("") | Some("-") => return "home".into(),
            Some(rest) if rest.starts_with('-') => rest,
            // Prefix matched mid-component, e.g. /home/me vs /home/meg
            _ => dir_name,
        }
    } else {
        dir_name
    };

    let label = rel.trim_start_matches('-');
    if label.is_empty() {
        "unknown".into()
    } else {
        label.into()
    }
}

fn encode_path(path: &str) -> String {
    path.replace(['/', '.'], "-")
}
