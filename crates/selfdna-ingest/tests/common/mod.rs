//! Shared helpers for integration tests
#![allow(dead_code)]

use selfdna_ingest::gwas::{GwasClient, GwasConfig};
use serde_json::{json, Value};
use std::path::PathBuf;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Client pointed at a mock catalog
pub fn client_for(server: &MockServer) -> GwasClient {
    let config = GwasConfig::builder()
        .base_url(format!("{}/gwas/rest/api/", server.uri()))
        .timeout_secs(5)
        .build();
    GwasClient::new(config).unwrap()
}

/// One association returned by the mock catalog
pub struct MockAssociation {
    pub pvalue: Value,
    pub study_id: u32,
    pub trait_name: &'static str,
    pub pubmed_id: &'static str,
}

impl MockAssociation {
    pub fn new(pvalue: Value, study_id: u32, trait_name: &'static str, pubmed_id: &'static str) -> Self {
        Self {
            pvalue,
            study_id,
            trait_name,
            pubmed_id,
        }
    }
}

pub fn snp_path(rsid: &str) -> String {
    format!("/gwas/rest/api/singleNucleotidePolymorphisms/{}", rsid)
}

pub fn study_path(study_id: u32) -> String {
    format!("/gwas/rest/api/studies/GCST{:06}", study_id)
}

/// Variant document with a templated associations link, as the catalog serves it
pub fn snp_document(server: &MockServer, rsid: &str, class: &str, region: &str) -> Value {
    json!({
        "rsId": rsid,
        "functionalClass": class,
        "locations": [{ "chromosomeName": "20", "region": { "name": region } }],
        "_links": {
            "associations": {
                "href": format!("{}{}/associations{{?projection}}", server.uri(), snp_path(rsid)),
                "templated": true
            }
        }
    })
}

pub fn associations_document(server: &MockServer, associations: &[MockAssociation]) -> Value {
    let entries: Vec<Value> = associations
        .iter()
        .map(|a| {
            json!({
                "pvalue": a.pvalue,
                "_links": {
                    "study": { "href": format!("{}{}", server.uri(), study_path(a.study_id)) }
                }
            })
        })
        .collect();

    json!({ "_embedded": { "associations": entries } })
}

pub fn study_document(trait_name: &str, pubmed_id: &str) -> Value {
    json!({
        "diseaseTrait": { "trait": trait_name },
        "publicationInfo": { "pubmedId": pubmed_id }
    })
}

/// Mount the whole variant -> associations -> study chain for one identifier
pub async fn mount_chain(
    server: &MockServer,
    rsid: &str,
    class: &str,
    region: &str,
    associations: &[MockAssociation],
) {
    Mock::given(method("GET"))
        .and(path(snp_path(rsid)))
        .respond_with(ResponseTemplate::new(200).set_body_json(snp_document(server, rsid, class, region)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/associations", snp_path(rsid))))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(associations_document(server, associations)),
        )
        .mount(server)
        .await;

    for association in associations {
        Mock::given(method("GET"))
            .and(path(study_path(association.study_id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(study_document(association.trait_name, association.pubmed_id)),
            )
            .mount(server)
            .await;
    }
}

/// Like [`mount_chain`], but the variant document has no functional class
/// and no locations
pub async fn mount_unlocated(server: &MockServer, rsid: &str, associations: &[MockAssociation]) {
    let document = json!({
        "rsId": rsid,
        "_links": {
            "associations": {
                "href": format!("{}{}/associations", server.uri(), snp_path(rsid))
            }
        }
    });

    Mock::given(method("GET"))
        .and(path(snp_path(rsid)))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/associations", snp_path(rsid))))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(associations_document(server, associations)),
        )
        .mount(server)
        .await;

    for association in associations {
        Mock::given(method("GET"))
            .and(path(study_path(association.study_id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(study_document(association.trait_name, association.pubmed_id)),
            )
            .mount(server)
            .await;
    }
}

/// Make every lookup for `rsid` fail at the first request
pub async fn mount_failure(server: &MockServer, rsid: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(snp_path(rsid)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
