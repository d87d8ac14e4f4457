//! Upstream fetching
//!
//! This module provides:
//! - The shared HTTP client (user agent, timeout, compression)
//! - Bulletin summary and detail fetches
//! - Paged subsidy searches and budget lookups behind an explicit session
//! - Fixed-delay pacing around enrichment calls

mod pacer;
mod session;

pub use pacer::*;
pub use session::*;

use crate::config::{Config, FetchConfig};
use crate::error::{Error, Result};
use crate::models::SubsidyRecord;
use crate::parse::{parse_subsidy_budget, parse_subsidy_page, parse_summary_json, SummaryOutcome};
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Build the HTTP client shared by all upstream fetches
pub fn build_client(config: &FetchConfig) -> Result<Client> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    Ok(Url::parse(&format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))?)
}

/// Official bulletin summaries and item details
#[derive(Debug, Clone)]
pub struct BulletinClient {
    client: Client,
    base_url: String,
    pacer: Pacer,
}

impl BulletinClient {
    pub fn new(client: Client, base_url: &str, pacer: Pacer) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            pacer,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            build_client(&config.fetch)?,
            &config.bulletin.base_url,
            Pacer::from_millis(config.fetch.delay_ms),
        ))
    }

    pub fn summary_url(&self, date: NaiveDate) -> Result<Url> {
        endpoint(
            &self.base_url,
            &format!("datosabiertos/api/boe/sumario/{}", date.format("%Y%m%d")),
        )
    }

    pub fn detail_url(&self, id: &str) -> Result<Url> {
        let mut url = endpoint(&self.base_url, "diario_boe/xml.php")?;
        url.query_pairs_mut().append_pair("id", id);
        Ok(url)
    }

    /// Fetch and parse the summary for `date`
    ///
    /// Never fails: transport errors and error statuses become
    /// [`SummaryOutcome::Unavailable`] so the caller can record them. A 404
    /// is the upstream's answer for a day without a bulletin.
    pub async fn fetch_summary(&self, date: NaiveDate) -> SummaryOutcome {
        let url = match self.summary_url(date) {
            Ok(url) => url,
            Err(e) => return SummaryOutcome::Unavailable(e.to_string()),
        };
        debug!("Fetching summary: {}", url);

        let response = match self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return SummaryOutcome::Unavailable(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("No bulletin published on {}", date);
            return SummaryOutcome::NoPublication;
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return SummaryOutcome::Unavailable(e.to_string()),
        };
        if !status.is_success() {
            return SummaryOutcome::Unavailable(format!("HTTP {}: {}", status, url));
        }
        parse_summary_json(&body, date)
    }

    /// Fetch the raw detail XML of one item, paced
    pub async fn fetch_detail(&self, id: &str) -> Result<String> {
        self.pacer.wait().await;
        let url = self.detail_url(id)?;
        debug!("Fetching detail: {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::SourceUnavailable(format!("HTTP {}: {}", status, url)));
        }
        Ok(response.text().await?)
    }
}

/// Subsidy database searches and budget lookups
#[derive(Debug)]
pub struct SubsidyClient {
    client: Client,
    base_url: String,
    page_size: u32,
    max_pages: u32,
    session: SubsidySession,
    pacer: Pacer,
}

impl SubsidyClient {
    pub fn new(client: Client, config: &Config) -> Self {
        let subsidies = &config.subsidies;
        Self {
            client,
            base_url: subsidies.base_url.clone(),
            page_size: subsidies.page_size,
            max_pages: subsidies.max_pages,
            session: SubsidySession::new(
                &subsidies.base_url,
                Duration::from_secs(subsidies.session_ttl_secs),
            ),
            pacer: Pacer::from_millis(config.fetch.delay_ms),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(build_client(&config.fetch)?, config))
    }

    pub fn session(&self) -> &SubsidySession {
        &self.session
    }

    /// Search calls received between `from` and `to`, following pages
    pub async fn search(&mut self, from: NaiveDate, to: NaiveDate) -> Result<Vec<SubsidyRecord>> {
        let mut records = Vec::new();
        let mut page = 0u32;

        loop {
            let mut url = endpoint(&self.base_url, "convocatorias/busqueda")?;
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("pageSize", &self.page_size.to_string())
                .append_pair("order", "numeroConvocatoria")
                .append_pair("direccion", "desc")
                .append_pair("fechaDesde", &from.format("%d/%m/%Y").to_string())
                .append_pair("fechaHasta", &to.format("%d/%m/%Y").to_string());

            let payload = self.get_json(url).await?;
            let parsed = parse_subsidy_page(&payload);
            debug!(
                "Subsidy page {} of {}: {} records",
                page + 1,
                parsed.total_pages,
                parsed.records.len()
            );
            let empty = parsed.records.is_empty();
            records.extend(parsed.records);

            page += 1;
            if empty || page >= parsed.total_pages || page >= self.max_pages {
                break;
            }
        }

        info!("Fetched {} subsidy calls ({} pages)", records.len(), page);
        Ok(records)
    }

    /// Budget of one call, paced; `Ok(None)` when the payload has none
    pub async fn fetch_budget(&mut self, id: &str) -> Result<Option<f64>> {
        self.pacer.wait().await;
        let mut url = endpoint(&self.base_url, "convocatorias")?;
        url.query_pairs_mut().append_pair("numConv", id);
        let payload = self.get_json(url).await?;
        Ok(parse_subsidy_budget(&payload))
    }

    /// GET with the session cookie, re-opening the session once on 401/403
    async fn get_json(&mut self, url: Url) -> Result<Value> {
        let mut retried = false;
        loop {
            let cookie = self.session.cookie(&self.client).await?;
            let response = self
                .client
                .get(url.clone())
                .header(ACCEPT, "application/json")
                .header(COOKIE, cookie)
                .send()
                .await?;

            let status = response.status();
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) && !retried {
                warn!("Subsidy API answered {}; re-opening session", status);
                self.session.invalidate();
                retried = true;
                continue;
            }
            if !status.is_success() {
                return Err(Error::SourceUnavailable(format!("HTTP {}: {}", status, url)));
            }
            return Ok(response.json().await?);
        }
    }
}
