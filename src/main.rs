//! Interactive CLI for extracting video URLs from Patreon posts.

use std::io::{self, BufRead, Write};

use anyhow::Context;
use chrono::NaiveDate;

use patreon_video_extractor::client::{self, Creator, PatreonClient};
use patreon_video_extractor::error::ScraperError;
use patreon_video_extractor::output::{CreatorExport, DateFilter, OutputWriter, PostExport};
use patreon_video_extractor::{auth, extractor, ScraperConfig};

/// Output targets chosen for this run.
struct OutputSelection {
    json: bool,
    txt: bool,
    dedupe_txt: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patreon_video_extractor=info".parse().unwrap()),
        )
        .init();

    run().await
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let config = ScraperConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    print_banner();

    // Step 1: authenticate with the exported browser session.
    println!("Authenticating with Patreon...");
    let (http, csrf_token, profile) = match auth::authenticate(&config).await {
        Ok(session) => session,
        Err(ScraperError::CookiesNotFound { dir }) => {
            println!("\nError: no cookie export found in {dir}");
            println!("\nPlease export your Patreon cookies using a browser extension:");
            println!("  1. Install 'Cookie-Editor' or 'EditThisCookie' extension");
            println!("  2. Log into Patreon in your browser");
            println!("  3. Export cookies as JSON");
            println!("  4. Save to {}/{}", config.cookies_dir, config.cookies_file);
            std::process::exit(1);
        }
        Err(e) => {
            println!("\nAuthentication failed: {e}");
            std::process::exit(1);
        }
    };
    println!("Logged in as: {}", profile.name);
    println!("  Email: {}", profile.email);
    println!("  Active memberships: {}", profile.pledge_count);

    // Step 2: enumerate subscribed creators. The compatibility probe runs
    // only in interactive mode, where its result shows in the menu.
    println!("\nFetching subscribed creators...");
    let patreon = PatreonClient::new(http, csrf_token, config.clone());

    let check_compat = !config.auto_mode;
    let creators = match patreon.get_creators(check_compat).await {
        Ok(creators) => creators,
        Err(e) => {
            println!("\nFailed to fetch creators: {e}");
            std::process::exit(1);
        }
    };
    println!("Found {} creator(s)", creators.len());

    if creators.is_empty() {
        println!("\nNo creators found. Make sure you have active memberships.");
        std::process::exit(1);
    }

    // Step 3: pick creators, either from config or interactively.
    let selected = if config.auto_mode {
        select_creators_auto(&config, creators)
    } else {
        print_creator_list(&creators);

        println!("\nSelect a creator to scrape:");
        println!("  - Enter a number (1-{})", creators.len());
        println!("  - Enter 'all' to scrape all creators");
        println!("  - Enter 'q' to quit");

        match prompt_creator_selection(&creators)? {
            Some(selected) => selected,
            None => {
                println!("Exiting...");
                return Ok(());
            }
        }
    };

    // Step 4: optional date filtering (interactive mode only).
    let mut date_filter = DateFilter::default();
    if !config.auto_mode {
        let should_filter = match config.use_date_filter {
            Some(preset) => preset,
            None => prompt("\nApply date range filter? (y/n): ")?.eq_ignore_ascii_case("y"),
        };
        if should_filter {
            date_filter = prompt_date_filter()?;
        }
    }

    // Step 5: output format selection (interactive mode only).
    let outputs = if config.auto_mode {
        OutputSelection {
            json: config.output_json,
            txt: config.output_raw_urls,
            dedupe_txt: config.dedupe_raw_urls,
        }
    } else {
        prompt_output_selection(config.dedupe_raw_urls)?
    };

    // Step 6: scrape each selected creator in turn.
    println!("\n{}", "=".repeat(60));
    println!("Starting scrape...");
    println!("{}", "=".repeat(60));

    let writer = OutputWriter::new(&config);
    for creator in &selected {
        scrape_creator(&patreon, &writer, &config, creator, &date_filter, &outputs).await;
    }

    println!("\n{}", "=".repeat(60));
    println!("Scraping complete!");
    println!("{}", "=".repeat(60));

    Ok(())
}

/// Scrape one creator's posts, extract video URLs, and write exports.
async fn scrape_creator(
    patreon: &PatreonClient,
    writer: &OutputWriter,
    config: &ScraperConfig,
    creator: &Creator,
    date_filter: &DateFilter,
    outputs: &OutputSelection,
) {
    println!("\n{}", "-".repeat(60));
    println!("Scraping: {} (@{})", creator.name, creator.vanity);
    println!("{}", "-".repeat(60));

    let posts = match patreon
        .get_creator_posts(&creator.vanity, config.max_posts_per_creator)
        .await
    {
        Ok(posts) => posts,
        Err(ScraperError::IncompatibleCreator { .. }) => {
            println!("  INCOMPATIBLE FORMAT");
            println!("  This creator uses Patreon's Creator Website layout.");
            println!("  Videos are hosted on Patreon, not Vimeo/YouTube.");
            println!("  Skipping {}", creator.name);
            return;
        }
        Err(e) => {
            println!("  Failed to fetch posts: {e}");
            return;
        }
    };
    println!("  Fetched {} post(s)", posts.len());

    let posts = if date_filter.is_active() {
        let filtered =
            client::filter_posts_by_date(posts, date_filter.start_date, date_filter.end_date);
        println!("  {} post(s) after date filtering", filtered.len());
        filtered
    } else {
        posts
    };

    if posts.is_empty() {
        println!("  No posts to process.");
        return;
    }

    println!("  Processing posts and extracting video URLs...");

    let total = posts.len();
    let mut results: Vec<PostExport> = Vec::new();
    let mut total_video_urls = 0usize;

    for (i, post) in posts.into_iter().enumerate() {
        let post = patreon.enrich_post(post).await;
        let video_urls = extractor::extract_all_video_urls(&post, &config.extractor);

        if !video_urls.is_empty() {
            total_video_urls += video_urls.len();
            let title = post.attributes.title.as_deref().unwrap_or("Untitled");
            println!(
                "    [{}/{}] \"{}\" - {} URL(s)",
                i + 1,
                total,
                title,
                video_urls.len()
            );
        }

        if !video_urls.is_empty() || config.include_posts_without_videos {
            results.push(PostExport::from_post(&post, video_urls));
        }
    }

    if config.sort_posts_by_date {
        results.sort_by(|a, b| {
            let a_key = a.published_at.as_deref().unwrap_or("");
            let b_key = b.published_at.as_deref().unwrap_or("");
            if config.sort_descending {
                b_key.cmp(a_key)
            } else {
                a_key.cmp(b_key)
            }
        });
    }

    if !outputs.json && !outputs.txt {
        println!("\n  Warning: both JSON and raw URL output are disabled.");
        println!("  No files will be saved. Enable at least one output format.");
        println!("  Total video URLs found: {total_video_urls}");
        return;
    }

    if total_video_urls == 0 && config.skip_export_if_no_videos {
        println!("\n  No video URLs found - skipping export.");
        println!("  Total video URLs found: {total_video_urls}");
        return;
    }

    let all_video_urls: Vec<String> = results
        .iter()
        .flat_map(|p| p.video_urls.iter().cloned())
        .collect();
    let export = CreatorExport::new(creator, date_filter.clone(), results);

    println!();
    let mut saved_any = false;

    if outputs.json {
        match writer.write_json(&export).await {
            Ok(path) => {
                println!("  JSON saved to: {}", path.display());
                saved_any = true;
            }
            Err(e) => println!("  Failed to save JSON: {e}"),
        }
    }

    if outputs.txt {
        match writer
            .write_raw_urls(&all_video_urls, &creator.vanity, outputs.dedupe_txt)
            .await
        {
            Ok(path) => {
                println!("  Raw URLs saved to: {}", path.display());
                saved_any = true;
            }
            Err(e) => println!("  Failed to save raw URLs: {e}"),
        }
    }

    if saved_any {
        println!("  Total video URLs found: {total_video_urls}");
    }
}

/// Resolve the creator selection from config without prompting.
fn select_creators_auto(config: &ScraperConfig, creators: Vec<Creator>) -> Vec<Creator> {
    println!("\n{}", "=".repeat(60));
    println!("Running in AUTO MODE (non-interactive)");
    println!("{}", "=".repeat(60));

    let selected = if config.selected_creators.is_empty() {
        println!("Creators: ALL ({} creators)", creators.len());
        creators
    } else {
        let selected: Vec<Creator> = creators
            .iter()
            .filter(|c| config.selected_creators.contains(&c.vanity))
            .cloned()
            .collect();

        if selected.is_empty() {
            println!(
                "\nNone of the configured creators found: {:?}",
                config.selected_creators
            );
            let available: Vec<&str> = creators.iter().map(|c| c.vanity.as_str()).collect();
            println!("Available creators: {available:?}");
            std::process::exit(1);
        }

        let names: Vec<&str> = selected.iter().map(|c| c.name.as_str()).collect();
        println!("Creators: {}", names.join(", "));
        selected
    };

    let mut formats = Vec::new();
    if config.output_json {
        formats.push("JSON");
    }
    if config.output_raw_urls {
        formats.push("TXT");
    }
    if formats.is_empty() {
        println!("Output: None (check config!)");
    } else {
        println!("Output: {}", formats.join(" + "));
    }
    println!(
        "Deduplication: {}",
        if config.dedupe_raw_urls {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("{}", "=".repeat(60));

    selected
}

fn print_banner() {
    println!("{}", "=".repeat(60));
    println!("  Patreon Video Extractor v{}", env!("CARGO_PKG_VERSION"));
    println!("  Extract Vimeo & YouTube URLs from Patreon posts");
    println!("{}", "=".repeat(60));
}

fn print_creator_list(creators: &[Creator]) {
    println!("\nSubscribed creators:");
    for (i, creator) in creators.iter().enumerate() {
        let name: String = creator.name.chars().take(28).collect();
        let marker = if creator.compatible == Some(false) {
            "  [NOT SUPPORTED]"
        } else {
            ""
        };
        println!("  {:2}. {:28} (@{}){}", i + 1, name, creator.vanity, marker);
    }
    if creators.iter().any(|c| c.compatible == Some(false)) {
        println!("\n  [NOT SUPPORTED] = Creator Website format (Patreon-hosted videos)");
    }
}

/// Loop until the user picks a creator number, 'all', or quits.
fn prompt_creator_selection(creators: &[Creator]) -> anyhow::Result<Option<Vec<Creator>>> {
    loop {
        let choice = prompt("\nYour choice: ")?.to_lowercase();

        if choice == "q" {
            return Ok(None);
        }
        if choice == "all" {
            return Ok(Some(creators.to_vec()));
        }

        match choice.parse::<usize>() {
            Ok(n) if n >= 1 && n <= creators.len() => {
                return Ok(Some(vec![creators[n - 1].clone()]));
            }
            Ok(_) => println!("Please enter a number between 1 and {}", creators.len()),
            Err(_) => println!("Invalid input. Please enter a number, 'all', or 'q'"),
        }
    }
}

/// Ask for optional start and end dates, swapping them if reversed.
///
/// A parse failure abandons the filter entirely rather than keeping a
/// half-entered range.
fn prompt_date_filter() -> anyhow::Result<DateFilter> {
    let mut filter = DateFilter::default();

    let start = prompt("Start date (YYYY-MM-DD) or press Enter to skip: ")?;
    if !start.is_empty() {
        match client::parse_date_input(&start) {
            Ok(date) => filter.start_date = Some(date),
            Err(e) => {
                println!("Warning: {e}");
                println!("Proceeding without date filter...");
                return Ok(DateFilter::default());
            }
        }
    }

    let end = prompt("End date (YYYY-MM-DD) or press Enter to skip: ")?;
    if !end.is_empty() {
        match client::parse_date_input(&end) {
            Ok(date) => filter.end_date = Some(date),
            Err(e) => {
                println!("Warning: {e}");
                println!("Proceeding without date filter...");
                return Ok(DateFilter::default());
            }
        }
    }

    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if start > end {
            println!("Warning: Start date is after end date. Swapping...");
            filter.start_date = Some(end);
            filter.end_date = Some(start);
        }
    }

    println!(
        "\nDate filter: {} to {}",
        date_or_any(filter.start_date),
        date_or_any(filter.end_date)
    );

    Ok(filter)
}

fn date_or_any(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string())
        .unwrap_or_else(|| "any".to_string())
}

/// Loop until the user picks an output format, then ask about TXT dedup.
fn prompt_output_selection(default_dedupe: bool) -> anyhow::Result<OutputSelection> {
    println!("\nSelect output format:");
    println!("  1. JSON only (with metadata)");
    println!("  2. TXT only (raw URLs)");
    println!("  3. Both JSON and TXT");

    let (json, txt) = loop {
        match prompt("\nYour choice (1-3): ")?.as_str() {
            "1" => break (true, false),
            "2" => break (false, true),
            "3" => break (true, true),
            _ => println!("Invalid input. Please enter 1, 2, or 3"),
        }
    };

    let dedupe_txt = if txt {
        prompt("\nDeduplicate URLs in raw TXT export? (y/n): ")?.eq_ignore_ascii_case("y")
    } else {
        default_dedupe
    };

    let mut formats = Vec::new();
    if json {
        formats.push("JSON".to_string());
    }
    if txt {
        let note = if dedupe_txt {
            "deduplicated"
        } else {
            "with duplicates"
        };
        formats.push(format!("TXT ({note})"));
    }
    println!("\nOutput format: {}", formats.join(" + "));

    Ok(OutputSelection {
        json,
        txt,
        dedupe_txt,
    })
}

/// Print a prompt and read one trimmed line from stdin.
fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    read_trimmed_line(&mut io::stdin().lock())
}

/// Read one trimmed line. A closed input stream is an error, not an empty
/// answer.
fn read_trimmed_line(reader: &mut impl BufRead) -> anyhow::Result<String> {
    let mut input = String::new();
    if reader.read_line(&mut input)? == 0 {
        anyhow::bail!("input stream closed");
    }
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_trimmed_line_trims_whitespace() {
        let mut input = Cursor::new("  all \n");
        assert_eq!(read_trimmed_line(&mut input).unwrap(), "all");
    }

    #[test]
    fn test_read_trimmed_line_without_trailing_newline() {
        let mut input = Cursor::new("q");
        assert_eq!(read_trimmed_line(&mut input).unwrap(), "q");
    }

    #[test]
    fn test_read_trimmed_line_errors_on_closed_input() {
        assert!(read_trimmed_line(&mut Cursor::new("")).is_err());
    }
}
