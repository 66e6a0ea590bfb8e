//! [`PageDriver`] implementation over a chromiumoxide CDP page.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use tokio::time::{Instant, sleep, timeout};

use super::{DriverResult, PageDriver};
use crate::error::DriverError;
use crate::types::StoredCookie;

const FIND_POLL_MS: u64 = 250;

/// Drives one live CDP page.
pub struct CdpDriver {
	page: Page,
}

impl CdpDriver {
	pub fn new(page: Page) -> Self {
		Self { page }
	}

	fn protocol(err: impl std::fmt::Display) -> DriverError {
		DriverError::Protocol(err.to_string())
	}
}

#[async_trait]
impl PageDriver for CdpDriver {
	async fn goto(&self, url: &str, deadline: Duration) -> DriverResult<()> {
		match timeout(deadline, self.page.goto(url)).await {
			Ok(Ok(_)) => Ok(()),
			Ok(Err(err)) => Err(Self::protocol(err)),
			Err(_) => Err(DriverError::Timeout { ms: deadline.as_millis() as u64 }),
		}
	}

	async fn find(&self, selector: &str, deadline: Duration) -> DriverResult<()> {
		let started = Instant::now();
		loop {
			if self.page.find_element(selector).await.is_ok() {
				return Ok(());
			}
			if started.elapsed() >= deadline {
				return Err(DriverError::Missing { selector: selector.to_string() });
			}
			sleep(Duration::from_millis(FIND_POLL_MS)).await;
		}
	}

	async fn click(&self, selector: &str) -> DriverResult<()> {
		let element = self
			.page
			.find_element(selector)
			.await
			.map_err(|_| DriverError::Missing { selector: selector.to_string() })?;
		element.click().await.map(|_| ()).map_err(Self::protocol)
	}

	async fn type_text(&self, selector: &str, text: &str) -> DriverResult<()> {
		let element = self
			.page
			.find_element(selector)
			.await
			.map_err(|_| DriverError::Missing { selector: selector.to_string() })?;
		element.click().await.map_err(Self::protocol)?;
		element.type_str(text).await.map(|_| ()).map_err(Self::protocol)
	}

	async fn evaluate(&self, script: &str) -> DriverResult<serde_json::Value> {
		let result = self.page.evaluate(script).await.map_err(Self::protocol)?;
		Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
	}

	async fn cookies(&self) -> DriverResult<Vec<StoredCookie>> {
		let cookies = self.page.get_cookies().await.map_err(Self::protocol)?;
		Ok(cookies
			.into_iter()
			.map(|c| StoredCookie {
				name: c.name,
				value: c.value,
				domain: c.domain,
				path: c.path,
				secure: c.secure,
				http_only: c.http_only,
				// CDP reports -1 for session cookies.
				expires: (c.expires >= 0.0).then_some(c.expires),
			})
			.collect())
	}

	async fn set_cookies(&self, cookies: Vec<StoredCookie>) -> DriverResult<()> {
		let mut params = Vec::with_capacity(cookies.len());
		for cookie in cookies {
			let mut builder = CookieParam::builder()
				.name(cookie.name)
				.value(cookie.value)
				.domain(cookie.domain)
				.path(cookie.path)
				.secure(cookie.secure)
				.http_only(cookie.http_only);
			if let Some(expires) = cookie.expires {
				builder = builder.expires(TimeSinceEpoch::new(expires));
			}
			params.push(builder.build().map_err(DriverError::Protocol)?);
		}
		self.page.set_cookies(params).await.map(|_| ()).map_err(Self::protocol)
	}

	async fn current_url(&self) -> DriverResult<String> {
		let url = self.page.url().await.map_err(Self::protocol)?;
		Ok(url.unwrap_or_else(|| "about:blank".to_string()))
	}
}
