// Machine-readable report for `classify --json`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::Classification;

/// A batch of classifications plus the settings that produced them.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub classified_at: DateTime<Utc>,
    pub model: String,
    pub threshold: f64,
    pub phishing_count: usize,
    pub results: &'a [Classification],
}

impl<'a> JsonReport<'a> {
    pub fn new(results: &'a [Classification], model: String, threshold: f64) -> Self {
        let phishing_count = results
            .iter()
            .filter(|r| r.label == crate::pipeline::Label::Phishing)
            .count();
        Self {
            classified_at: Utc::now(),
            model,
            threshold,
            phishing_count,
            results,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Label;

    #[test]
    fn test_report_shape() {
        let results = vec![
            Classification {
                url: "https://www.google.com".to_string(),
                score: 0.1,
                label: Label::Benign,
            },
            Classification {
                url: "http://192.168.0.1".to_string(),
                score: 0.8,
                label: Label::Phishing,
            },
        ];
        let report = JsonReport::new(&results, "test model".to_string(), 0.5);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["phishing_count"], 1);
        assert_eq!(value["threshold"], 0.5);
        assert_eq!(value["results"][0]["label"], "BENIGN");
        assert_eq!(value["results"][1]["label"], "PHISHING");
        assert_eq!(value["results"][1]["url"], "http://192.168.0.1");
        assert!(value["classified_at"].as_str().is_some());
    }
}
