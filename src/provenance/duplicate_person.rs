//! Duplicate person resolution
//!
//! When the loader refuses a person because one with the same contact already
//! exists, the existing person is looked up by the contact carried on the
//! original row and its reference is used for that row's lease.

use crate::config::{fields, ImportConfig};
use crate::extract::SourceRow;
use crate::loader::PersonDirectory;
use import_types::{Condition, EntityKind};

pub const PEOPLE_LOOKUP_FAILED: &str = "Unable to get people information";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonResolution {
    /// Exactly one existing person; formatted reference
    Resolved(String),
    Failed(Condition),
}

pub struct DuplicatePersonResolver<'a> {
    config: &'a ImportConfig,
    directory: &'a dyn PersonDirectory,
}

impl<'a> DuplicatePersonResolver<'a> {
    pub fn new(config: &'a ImportConfig, directory: &'a dyn PersonDirectory) -> Self {
        Self { config, directory }
    }

    /// Look up the existing person for a source row
    pub async fn resolve(&self, row: &SourceRow<'_>) -> PersonResolution {
        let contact = match row.value(fields::EMAIL) {
            "" => row.value(fields::PHONE),
            email => email,
        };
        if contact.is_empty() {
            tracing::warn!(row = row.ordinal, "duplicate person without email or phone");
            return self.failed();
        }

        match self.directory.find_by_contact(contact).await {
            Ok(ids) => match ids.as_slice() {
                [id] => {
                    tracing::info!(row = row.ordinal, id, "duplicate person mapped to existing record");
                    PersonResolution::Resolved(self.person_ref(*id))
                }
                [] => {
                    tracing::warn!(row = row.ordinal, "duplicate person not found");
                    self.failed()
                }
                _ => {
                    tracing::warn!(row = row.ordinal, matches = ids.len(), "duplicate person is ambiguous");
                    self.failed()
                }
            },
            Err(err) => {
                tracing::warn!(row = row.ordinal, error = %err, "person lookup failed");
                self.failed()
            }
        }
    }

    pub fn person_ref(&self, id: i64) -> String {
        format!("{}{}", self.config.person_ref_prefix, id)
    }

    fn failed(&self) -> PersonResolution {
        PersonResolution::Failed(Condition::error(EntityKind::Person, PEOPLE_LOOKUP_FAILED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{detect_headers, Extract};
    use crate::loader::PersonMatch;
    use crate::testing::sample_config;
    use async_trait::async_trait;

    struct FixedDirectory(anyhow::Result<Vec<i64>>);

    #[async_trait]
    impl PersonDirectory for FixedDirectory {
        async fn find_by_contact(&self, _contact: &str) -> anyhow::Result<Vec<i64>> {
            match &self.0 {
                Ok(ids) => Ok(ids.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }

        async fn find_by_note(&self, _fragment: &str) -> anyhow::Result<Vec<PersonMatch>> {
            Ok(vec![])
        }
    }

    const DATA: &str = "Unit,Floor Plan,Unit/Lease Status,Name,Email,Phone\n\
                        101,2B2B,occupied,\"Doe, Pat\",pat@example.com,\n";

    async fn resolve_with(ids: anyhow::Result<Vec<i64>>) -> PersonResolution {
        let config = sample_config();
        let extract = Extract::from_reader(DATA.as_bytes()).unwrap();
        let detection = detect_headers(extract.rows(), &config.headers).unwrap();
        let row = SourceRow::new(2, extract.row(2).unwrap(), &detection.headers);
        let directory = FixedDirectory(ids);
        DuplicatePersonResolver::new(&config, &directory).resolve(&row).await
    }

    #[tokio::test]
    async fn test_single_match_resolves() {
        assert_eq!(
            resolve_with(Ok(vec![42])).await,
            PersonResolution::Resolved("TC00042".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_ambiguous_and_failed_lookups() {
        let expected =
            PersonResolution::Failed(Condition::error(EntityKind::Person, PEOPLE_LOOKUP_FAILED));
        assert_eq!(resolve_with(Ok(vec![])).await, expected);
        assert_eq!(resolve_with(Ok(vec![1, 2])).await, expected);
        assert_eq!(resolve_with(Err(anyhow::anyhow!("db down"))).await, expected);
    }
}
