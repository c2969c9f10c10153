// GWAS Catalog HTTP client

use super::config::GwasConfig;
use super::models::{AssociationsResponse, SnpResponse, StudyResponse};
use super::{Annotator, GwasError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use selfdna_common::types::AnnotationResult;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Joins the per-study entries of an associations summary
pub const ASSOCIATION_SEPARATOR: &str = " | ";

const SNP_RESOURCE: &str = "singleNucleotidePolymorphisms";

/// Client for chained variant -> associations -> study lookups
pub struct GwasClient {
    client: Client,
    base_url: Url,
    config: GwasConfig,
}

impl GwasClient {
    /// Create a new client
    pub fn new(config: GwasConfig) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(GwasClient {
            client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &GwasConfig {
        &self.config
    }

    /// URL of the variant resource for an identifier
    pub fn variant_url(&self, identifier: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GwasError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(SNP_RESOURCE)
            .push(identifier);
        Ok(url)
    }

    /// Run the full lookup chain for one identifier.
    ///
    /// Associations whose p-value is not numeric are left out. Any other
    /// problem fails the whole chain, including having no association left.
    pub async fn lookup(&self, identifier: &str) -> Result<AnnotationResult> {
        let snp: SnpResponse = self.get_json(self.variant_url(identifier)?.as_str()).await?;

        let functional_class = snp.functional_class.clone();
        let region = snp.region_name().map(str::to_string);
        let associations_url = snp
            .associations_link()
            .ok_or(GwasError::MissingField("_links.associations.href"))?
            .resolved()
            .to_string();

        let page: AssociationsResponse = self.get_json(&associations_url).await?;

        let mut entries = Vec::new();
        let mut min_p_value: Option<f64> = None;

        for association in page.into_associations() {
            let Some(p_value) = association.p_value() else {
                debug!(
                    identifier = identifier,
                    pvalue = ?association.pvalue,
                    "Skipping association with non-numeric p-value"
                );
                continue;
            };

            let study_url = association
                .study_link()
                .ok_or(GwasError::MissingField("_links.study.href"))?
                .resolved()
                .to_string();

            let study: StudyResponse = self.get_json(&study_url).await?;
            let trait_name = study
                .trait_name()
                .ok_or(GwasError::MissingField("diseaseTrait.trait"))?;
            let pubmed_id = study
                .pubmed_id()
                .ok_or(GwasError::MissingField("publicationInfo.pubmedId"))?;

            entries.push(format!(
                "{} [p = {}] [PubMed: {}]",
                trait_name,
                format_p_value(p_value),
                pubmed_id
            ));
            min_p_value = Some(min_p_value.map_or(p_value, |min| min.min(p_value)));
        }

        let Some(min_p_value) = min_p_value else {
            return Err(GwasError::NoAssociations);
        };

        Ok(AnnotationResult {
            functional_class,
            region,
            min_p_value: Some(min_p_value),
            associations: Some(entries.join(ASSOCIATION_SEPARATOR)),
        })
    }

    /// GET a JSON document, retrying transient failures when configured
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt: u32 = 1;

        loop {
            match self.fetch(url).await {
                Ok(body) => return Ok(serde_json::from_slice(&body)?),
                Err(e) if attempt < self.config.max_attempts && is_retryable(&e) => {
                    let backoff =
                        Duration::from_millis(self.config.retry_backoff_ms * u64::from(attempt));
                    debug!(
                        url = url,
                        attempt = attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Request failed, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GwasError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

fn is_retryable(err: &GwasError) -> bool {
    match err {
        GwasError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        GwasError::Status { status, .. } => *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl Annotator for GwasClient {
    async fn annotate(&self, identifier: &str, alt_allele: &str) -> AnnotationResult {
        match self.lookup(identifier).await {
            Ok(result) => {
                debug!(
                    identifier = identifier,
                    alt = alt_allele,
                    min_p_value = ?result.min_p_value,
                    "Annotated variant"
                );
                result
            },
            Err(e) => {
                warn!(
                    identifier = identifier,
                    alt = alt_allele,
                    error = %e,
                    "GWAS lookup failed, storing variant without annotation"
                );
                AnnotationResult::absent()
            },
        }
    }
}

/// Shortest round-trip rendering of a p-value: positional between 1e-4 and
/// 1e16, `<m>e<sign><2+ digit exp>` outside, always with a fraction or exponent.
pub fn format_p_value(value: f64) -> String {
    let abs = value.abs();

    if abs != 0.0 && abs.is_finite() && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{:e}", value);
        return match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            },
            None => sci,
        };
    }

    let text = value.to_string();
    if text.contains('.') || !value.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_url() {
        let client = GwasClient::new(GwasConfig::default()).unwrap();
        assert_eq!(
            client.variant_url("rs6016399").unwrap().as_str(),
            "https://www.ebi.ac.uk/gwas/rest/api/singleNucleotidePolymorphisms/rs6016399"
        );

        let client =
            GwasClient::new(GwasConfig::builder().base_url("http://localhost:8080/api").build())
                .unwrap();
        assert_eq!(
            client.variant_url("rs1").unwrap().as_str(),
            "http://localhost:8080/api/singleNucleotidePolymorphisms/rs1"
        );
    }

    #[test]
    fn test_format_p_value() {
        assert_eq!(format_p_value(0.01), "0.01");
        assert_eq!(format_p_value(0.0001), "0.0001");
        assert_eq!(format_p_value(1.0), "1.0");
        assert_eq!(format_p_value(2e-8), "2e-08");
        assert_eq!(format_p_value(3.5e-12), "3.5e-12");
        assert_eq!(format_p_value(5e-300), "5e-300");
        assert_eq!(format_p_value(0.0), "0.0");
    }

    #[test]
    fn test_retryable_errors() {
        let server_error = GwasError::Status {
            status: 503,
            url: "http://x".to_string(),
        };
        let not_found = GwasError::Status {
            status: 404,
            url: "http://x".to_string(),
        };
        assert!(is_retryable(&server_error));
        assert!(!is_retryable(&not_found));
        assert!(!is_retryable(&GwasError::MissingField("functionalClass")));
        assert!(!is_retryable(&GwasError::NoAssociations));
    }
}
