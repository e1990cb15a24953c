use dailynotes_types::models::Task;

pub const DEFAULT_TITLE: &str = "Good Morning! 🌞";
pub const DEFAULT_URL: &str = "/";
/// Data key carrying the deep-link target for the client.
pub const URL_KEY: &str = "url";

pub const ENCOURAGEMENT: &str =
    "Yesterday you didn't check off any tasks, but today is a new day! Let's get it!";

/// Digest body for a user's completed tasks.
pub fn compose_body(completed: &[Task]) -> String {
    if completed.is_empty() {
        return ENCOURAGEMENT.to_string();
    }

    let texts: Vec<&str> = completed.iter().map(|t| t.text.as_str()).collect();
    format!("Yesterday you accomplished: {}. Keep it up!", texts.join(", "))
}
