// GWAS Catalog response documents
//
// Only the fields used for annotation are modelled. The API speaks HAL, so
// follow-up links live under `_links.<rel>.href` and embedded collections
// under `_embedded`.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

impl Link {
    /// Strip a URI template suffix such as `{?projection}`
    pub fn resolved(&self) -> &str {
        match self.href.find('{') {
            Some(idx) => &self.href[..idx],
            None => &self.href,
        }
    }
}

// ============================================================================
// singleNucleotidePolymorphisms/{rsid}
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnpResponse {
    pub functional_class: Option<String>,
    #[serde(default)]
    pub locations: Vec<SnpLocation>,
    #[serde(rename = "_links")]
    pub links: Option<SnpLinks>,
}

impl SnpResponse {
    /// Region name of the first reported location
    pub fn region_name(&self) -> Option<&str> {
        self.locations
            .first()
            .and_then(|loc| loc.region.as_ref())
            .and_then(|region| region.name.as_deref())
    }

    pub fn associations_link(&self) -> Option<&Link> {
        self.links.as_ref().and_then(|links| links.associations.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnpLocation {
    pub region: Option<Region>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Region {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnpLinks {
    pub associations: Option<Link>,
}

// ============================================================================
// .../associations
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationsResponse {
    #[serde(rename = "_embedded")]
    pub embedded: Option<EmbeddedAssociations>,
}

impl AssociationsResponse {
    /// Empty collections omit `_embedded` entirely
    pub fn into_associations(self) -> Vec<Association> {
        self.embedded.map(|e| e.associations).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedAssociations {
    #[serde(default)]
    pub associations: Vec<Association>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Association {
    pub pvalue: Option<Value>,
    #[serde(rename = "_links")]
    pub links: Option<AssociationLinks>,
}

impl Association {
    /// Numeric p-value; strings holding a number are accepted
    pub fn p_value(&self) -> Option<f64> {
        let value = match self.pvalue.as_ref()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn study_link(&self) -> Option<&Link> {
        self.links.as_ref().and_then(|links| links.study.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationLinks {
    pub study: Option<Link>,
}

// ============================================================================
// studies/{id}
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyResponse {
    pub disease_trait: Option<DiseaseTrait>,
    pub publication_info: Option<PublicationInfo>,
}

impl StudyResponse {
    pub fn trait_name(&self) -> Option<&str> {
        self.disease_trait.as_ref()?.trait_name.as_deref()
    }

    /// PubMed ID rendered as text; the API has returned both strings and numbers
    pub fn pubmed_id(&self) -> Option<String> {
        match self.publication_info.as_ref()?.pubmed_id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiseaseTrait {
    #[serde(rename = "trait")]
    pub trait_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationInfo {
    pub pubmed_id: Option<Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snp_response_fields() {
        let doc = json!({
            "rsId": "rs6016399",
            "functionalClass": "regulatory_region_variant",
            "locations": [{ "chromosomeName": "20", "region": { "name": "20q12" } }],
            "_links": {
                "associations": {
                    "href": "https://www.ebi.ac.uk/gwas/rest/api/singleNucleotidePolymorphisms/rs6016399/associations{?projection}",
                    "templated": true
                }
            }
        });

        let snp: SnpResponse = serde_json::from_value(doc).unwrap();
        assert_eq!(snp.functional_class.as_deref(), Some("regulatory_region_variant"));
        assert_eq!(snp.region_name(), Some("20q12"));
        assert_eq!(
            snp.associations_link().unwrap().resolved(),
            "https://www.ebi.ac.uk/gwas/rest/api/singleNucleotidePolymorphisms/rs6016399/associations"
        );
    }

    #[test]
    fn test_p_value_shapes() {
        let assoc = |v: Value| Association { pvalue: Some(v), links: None };

        assert_eq!(assoc(json!(2e-8)).p_value(), Some(2e-8));
        assert_eq!(assoc(json!("0.03")).p_value(), Some(0.03));
        assert_eq!(assoc(json!("NR")).p_value(), None);
        assert_eq!(assoc(json!(null)).p_value(), None);
        assert_eq!(Association { pvalue: None, links: None }.p_value(), None);
    }

    #[test]
    fn test_empty_associations_page() {
        let page: AssociationsResponse =
            serde_json::from_value(json!({ "_links": {}, "page": { "totalElements": 0 } }))
                .unwrap();
        assert!(page.into_associations().is_empty());
    }

    #[test]
    fn test_study_numeric_pubmed() {
        let study: StudyResponse = serde_json::from_value(json!({
            "diseaseTrait": { "trait": "Height" },
            "publicationInfo": { "pubmedId": 25282103 }
        }))
        .unwrap();
        assert_eq!(study.trait_name(), Some("Height"));
        assert_eq!(study.pubmed_id().as_deref(), Some("25282103"));
    }
}
