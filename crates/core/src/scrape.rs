//! Listing-page scrape of the user's existing series.
//!
//! Scraping degrades gracefully: any failure returns an empty list, because
//! the matcher can operate (and fall back) without a cache.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::action::Actions;
use crate::platform::PlatformSpec;
use crate::types::PlatformItem;

/// Shape produced by the in-page collection script.
#[derive(Debug, Deserialize)]
struct ScrapedLink {
	href: String,
	name: String,
}

/// Navigates to the platform's listing page and extracts `{id, name}` pairs
/// from its structural locators. Errors are logged and swallowed.
pub async fn scrape_items(actions: &Actions<'_>, spec: &PlatformSpec) -> Vec<PlatformItem> {
	if let Err(err) = actions.navigate(spec.listing_url).await {
		warn!(target = "xpub.scrape", platform = %spec.platform, error = %err, "listing navigation failed");
		return Vec::new();
	}

	let script = collect_links_script(spec.item_link_selector);
	let value = match actions.evaluate(&script).await {
		Ok(value) => value,
		Err(err) => {
			warn!(target = "xpub.scrape", platform = %spec.platform, error = %err, "listing scrape failed");
			return Vec::new();
		}
	};

	let items = parse_scraped(&value);
	debug!(target = "xpub.scrape", platform = %spec.platform, count = items.len(), "series scraped");
	items
}

fn collect_links_script(selector: &str) -> String {
	format!(
		"JSON.stringify(Array.from(document.querySelectorAll(\"{selector}\"))\
		 .map(a => ({{ href: a.getAttribute(\"href\") || \"\", name: (a.textContent || \"\").trim() }})))"
	)
}

fn parse_scraped(value: &serde_json::Value) -> Vec<PlatformItem> {
	let Some(raw) = value.as_str() else {
		return Vec::new();
	};
	let links: Vec<ScrapedLink> = match serde_json::from_str(raw) {
		Ok(links) => links,
		Err(err) => {
			warn!(target = "xpub.scrape", error = %err, "scrape payload unparseable");
			return Vec::new();
		}
	};

	let mut items = Vec::new();
	for link in links {
		let Some(id) = extract_id(&link.href) else {
			continue;
		};
		if link.name.is_empty() {
			continue;
		}
		// The same series can be linked more than once per listing row.
		if items.iter().any(|existing: &PlatformItem| existing.id == id) {
			continue;
		}
		items.push(PlatformItem { id, name: link.name });
	}
	items
}

/// First run of decimal digits in an href; platform item URLs all embed the
/// numeric series id in the path.
fn extract_id(href: &str) -> Option<String> {
	let start = href.find(|c: char| c.is_ascii_digit())?;
	let digits: String = href[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
	(!digits.is_empty()).then_some(digits)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_first_digit_run() {
		assert_eq!(extract_id("/fiction/12345/my-cool-story"), Some("12345".into()));
		assert_eq!(extract_id("/myworks/987/write"), Some("987".into()));
		assert_eq!(extract_id("/about"), None);
	}

	#[test]
	fn parse_skips_unusable_and_duplicate_links() {
		let payload = serde_json::Value::String(
			r#"[
				{"href":"/fiction/111/alpha","name":"Alpha"},
				{"href":"/fiction/111/alpha","name":"Alpha (again)"},
				{"href":"/fiction/no-id","name":"Broken"},
				{"href":"/fiction/222/beta","name":""},
				{"href":"/fiction/333/gamma","name":"Gamma"}
			]"#
			.to_string(),
		);
		let items = parse_scraped(&payload);
		assert_eq!(
			items,
			vec![
				PlatformItem { id: "111".into(), name: "Alpha".into() },
				PlatformItem { id: "333".into(), name: "Gamma".into() },
			]
		);
	}

	#[test]
	fn non_string_payload_reads_as_empty() {
		assert!(parse_scraped(&serde_json::json!({ "unexpected": true })).is_empty());
		assert!(parse_scraped(&serde_json::Value::String("not json".into())).is_empty());
	}
}
