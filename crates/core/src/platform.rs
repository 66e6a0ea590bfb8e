//! Hand-tuned per-platform strategy objects.
//!
//! Each [`PlatformSpec`] carries the locators, URL templates, and
//! confirmation signals the generic publish workflow is parameterized by.
//! Locators here are maintained against each platform's live markup; when a
//! platform redesigns its composer, this is the only file that changes.

use crate::types::Platform;

/// Strategy value object consumed by the generic publish engine.
#[derive(Debug, Clone, Copy)]
pub struct PlatformSpec {
	pub platform: Platform,
	/// Login surface opened for the interactive (human-completed) login.
	pub login_url: &'static str,
	/// Present in the DOM only once an interactive login succeeded.
	pub login_success_selector: &'static str,
	/// Listing page holding the user's existing series.
	pub listing_url: &'static str,
	/// Anchor elements on the listing page linking to each series.
	pub item_link_selector: &'static str,
	/// Composer URL template; `{id}` is replaced with the matched series id.
	pub composer_url: &'static str,
	pub title_selector: &'static str,
	/// Iframe hosting the rich-text editor, when the editor is embedded.
	pub content_frame: Option<&'static str>,
	/// Editable surface inside the frame (or the main document).
	pub editor_body_selector: &'static str,
	/// Raw-markup target used when the editor surface never becomes ready.
	pub markup_fallback_selector: Option<&'static str>,
	pub tags_selector: Option<&'static str>,
	/// Clicked in order; more than one entry models a confirmation sequence.
	pub submit_selectors: &'static [&'static str],
	/// Appears only once the platform acknowledged the publication.
	pub published_selector: &'static str,
	pub nav_timeout_floor_ms: u64,
	pub nav_timeout_ceiling_ms: u64,
}

impl PlatformSpec {
	/// Expands the composer URL template for a matched series id.
	pub fn composer_url_for(&self, id: &str) -> String {
		self.composer_url.replace("{id}", id)
	}
}

static ROYALROAD: PlatformSpec = PlatformSpec {
	platform: Platform::RoyalRoad,
	login_url: "https://www.royalroad.com/account/login",
	login_success_selector: "a[href*='/account/logout']",
	listing_url: "https://www.royalroad.com/author-dashboard/fictions",
	item_link_selector: ".fiction-list-item a[href^='/fiction/']",
	composer_url: "https://www.royalroad.com/author-dashboard/chapters/new/{id}",
	title_selector: "input#Title",
	content_frame: Some("iframe#Content_ifr"),
	editor_body_selector: "body#tinymce",
	markup_fallback_selector: Some("textarea#Content"),
	tags_selector: None,
	submit_selectors: &["button#chapter-publish"],
	published_selector: "div.alert-success",
	nav_timeout_floor_ms: 8_000,
	nav_timeout_ceiling_ms: 30_000,
};

static SCRIBBLEHUB: PlatformSpec = PlatformSpec {
	platform: Platform::ScribbleHub,
	login_url: "https://www.scribblehub.com/login/",
	login_success_selector: "span.menu_username",
	listing_url: "https://www.scribblehub.com/dashboard/series/",
	item_link_selector: ".search_main_box a[href*='/series/']",
	composer_url: "https://www.scribblehub.com/addchapter/{id}/",
	title_selector: "input#chapter-title",
	content_frame: Some("iframe#edit_mycontent_chapter_ifr"),
	editor_body_selector: "body#tinymce",
	markup_fallback_selector: Some("textarea#edit_mycontent_chapter"),
	tags_selector: None,
	submit_selectors: &["button#pub_chp_btn"],
	published_selector: "div.p_alert_success",
	nav_timeout_floor_ms: 10_000,
	nav_timeout_ceiling_ms: 40_000,
};

static WATTPAD: PlatformSpec = PlatformSpec {
	platform: Platform::Wattpad,
	login_url: "https://www.wattpad.com/login",
	login_success_selector: "div#profile-dropdown",
	listing_url: "https://www.wattpad.com/myworks",
	item_link_selector: "a[href^='/myworks/']",
	composer_url: "https://www.wattpad.com/myworks/{id}/write",
	title_selector: "input.story-title",
	content_frame: None,
	editor_body_selector: "div[contenteditable='true']",
	markup_fallback_selector: None,
	tags_selector: Some("input#tag-input"),
	// Wattpad asks for an explicit confirmation after the publish button.
	submit_selectors: &["button.publish-part", "button.confirm-publish"],
	published_selector: "div.toast.success",
	nav_timeout_floor_ms: 8_000,
	nav_timeout_ceiling_ms: 30_000,
};

impl Platform {
	/// The hand-tuned strategy for this platform.
	pub fn spec(&self) -> &'static PlatformSpec {
		match self {
			Platform::RoyalRoad => &ROYALROAD,
			Platform::ScribbleHub => &SCRIBBLEHUB,
			Platform::Wattpad => &WATTPAD,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn composer_template_expands_id() {
		let url = Platform::RoyalRoad.spec().composer_url_for("12345");
		assert_eq!(url, "https://www.royalroad.com/author-dashboard/chapters/new/12345");
	}

	#[test]
	fn every_spec_is_internally_consistent() {
		for platform in Platform::ALL {
			let spec = platform.spec();
			assert_eq!(spec.platform, platform);
			assert!(spec.composer_url.contains("{id}"));
			assert!(!spec.submit_selectors.is_empty());
			assert!(spec.nav_timeout_floor_ms < spec.nav_timeout_ceiling_ms);
		}
	}
}
