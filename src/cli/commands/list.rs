use super::{print_json, use_color};
use crate::cli::ListArgs;
use crate::config;
use crate::error::Result;
use crate::format::{TextFormatOptions, format_issue_line_with, terminal_width};
use crate::storage::Page;

/// Execute the list command.
///
/// # Errors
///
/// `InvalidPage` for a page below 1, or a database error.
pub fn execute(
    args: &ListArgs,
    json: bool,
    no_color: bool,
    cli: &config::CliOverrides,
) -> Result<()> {
    let (storage, config) = config::open_storage(cli)?;
    let page = Page::new(args.page, args.page_size.unwrap_or(config.page_size))?;
    let listing = storage.list_issue_page(args.closed, page)?;

    tracing::debug!(
        closed = args.closed,
        page = page.page,
        returned = listing.issues.len(),
        total = listing.total,
        "Listed issues"
    );

    if json {
        return print_json(&listing);
    }

    let state = if args.closed { "closed" } else { "open" };
    if listing.issues.is_empty() {
        println!("No {state} issues on page {}.", listing.page);
        return Ok(());
    }

    let options = TextFormatOptions {
        use_color: use_color(no_color),
        max_width: Some(terminal_width()),
    };
    for issue in &listing.issues {
        println!("{}", format_issue_line_with(issue, options));
    }
    println!(
        "\n{} {state} (page {} of {})",
        listing.total,
        listing.page,
        listing.page_count()
    );
    Ok(())
}
