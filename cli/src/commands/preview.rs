use clap::Args;

use crate::commands::journal::draft_body;
use crate::util::{api_request, exit_error, read_text};

#[derive(Args)]
pub struct PreviewArgs {
    /// Draft title
    #[arg(long)]
    title: Option<String>,
    /// Draft text
    #[arg(long, required_unless_present = "content_file")]
    content: Option<String>,
    /// Read draft text from file (use '-' for stdin)
    #[arg(long, short = 'f', conflicts_with = "content")]
    content_file: Option<String>,
    /// Mood tag chosen by the writer (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

pub async fn run(api_url: &str, user_id: &str, args: PreviewArgs) -> i32 {
    let content = match (args.content, args.content_file) {
        (Some(c), _) => c,
        (None, Some(path)) => read_text(&path).unwrap_or_else(|e| exit_error(&e, None)),
        (None, None) => exit_error("Draft content is required", Some("Use --content or --content-file")),
    };

    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/analysis/preview",
        Some(user_id),
        Some(draft_body(args.title.as_deref(), &content, &args.tags)),
        &[],
    )
    .await
}
