//! Version-indexed upgrades of persisted documents.
//!
//! A migration registered for version `N` turns a document written by
//! version `N - 1` into one readable by version `N`. Migrations run in
//! ascending order against the loaded [`Document`] before any section sees
//! it. A failing step is logged and skipped; the next step then sees the
//! document as it was before the failure, so every step must tolerate data
//! already in its target shape.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::{
    document::Document,
    error::{Error, Result},
};

/// Schema version written by this build.
pub const CURRENT_VERSION: u32 = 1;

pub type MigrateFn = fn(&mut Document) -> Result<()>;

type Step = Box<dyn Fn(&mut Document) -> Result<()> + Send + Sync>;

/// A statically declared migration, registered with [`submit_migration!`](crate::submit_migration).
pub trait Migration: 'static + Send + Sync {
    /// The version this migration upgrades documents to.
    const TARGET: u32;

    fn migrate(document: &mut Document) -> Result<()>;
}

/// A registered migration descriptor.
pub struct RegisteredMigration {
    pub target: u32,
    pub f: MigrateFn,
}

impl RegisteredMigration {
    pub const fn new<M: Migration>() -> Self {
        Self {
            target: M::TARGET,
            f: M::migrate,
        }
    }
}

inventory::collect!(RegisteredMigration);

#[macro_export]
macro_rules! submit_migration {
    ($migration_type:ty) => {
        $crate::inventory::submit! {
            $crate::RegisteredMigration::new::<$migration_type>()
        }
    };
}

/// Applies registered migrations up to a target version.
pub struct Migrator {
    current_version: u32,
    steps: BTreeMap<u32, Step>,
}

impl Migrator {
    /// A migrator targeting [`CURRENT_VERSION`] with no steps.
    pub fn new() -> Self {
        Self::with_current_version(CURRENT_VERSION)
    }

    pub fn with_current_version(current_version: u32) -> Self {
        Self {
            current_version,
            steps: BTreeMap::new(),
        }
    }

    /// Adds every migration submitted with [`submit_migration!`](crate::submit_migration).
    pub fn with_registered(mut self) -> Self {
        for registration in inventory::iter::<RegisteredMigration> {
            let _ = self.register(registration.target, registration.f);
        }
        self
    }

    /// Registers `step` as the upgrade to `target`.
    ///
    /// Only one step per version; a second registration is logged and
    /// rejected with [`Error::DuplicateMigration`].
    pub fn register<F>(&mut self, target: u32, step: F) -> Result<()>
    where
        F: Fn(&mut Document) -> Result<()> + Send + Sync + 'static,
    {
        if self.steps.contains_key(&target) {
            warn!(version = target, "migration already registered; ignoring duplicate");
            return Err(Error::DuplicateMigration(target));
        }
        if target == 0 || target > self.current_version {
            warn!(
                version = target,
                current = self.current_version,
                "migration target outside 1..=current; it will never run"
            );
        }
        self.steps.insert(target, Box::new(step));
        Ok(())
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn has_step(&self, target: u32) -> bool {
        self.steps.contains_key(&target)
    }

    /// Schema version recorded in `document`, `0` when absent or invalid.
    pub fn extract_version(document: &Document) -> u32 {
        document.version()
    }

    pub fn is_stale(&self, version: u32) -> bool {
        version < self.current_version
    }

    /// Upgrades `document` from `from_version` to the current version.
    ///
    /// A no-op when `from_version` is already current or newer. Otherwise
    /// every registered step in `from_version + 1 ..= current` runs on a
    /// copy of the running document; the copy replaces it only if the step
    /// succeeds. The result is stamped with the current version.
    pub fn migrate(&self, document: Document, from_version: u32) -> Document {
        if from_version >= self.current_version {
            return document;
        }

        let mut document = document;
        for (&version, step) in self.steps.range(from_version + 1..=self.current_version) {
            let mut candidate = document.clone();
            match step(&mut candidate) {
                Ok(()) => {
                    debug!(version, "migration step applied");
                    document = candidate;
                }
                Err(err) => {
                    error!(version, error = %err, "migration step failed; keeping previous data");
                }
            }
        }

        document.set_version(self.current_version);
        info!(from = from_version, to = self.current_version, "settings migrated");
        document
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_outside_range_are_skipped() {
        let mut migrator = Migrator::with_current_version(3);
        migrator
            .register(1, |doc| {
                doc.insert("Log", "v1", "1");
                Ok(())
            })
            .unwrap();
        migrator
            .register(3, |doc| {
                doc.insert("Log", "v3", "1");
                Ok(())
            })
            .unwrap();
        migrator
            .register(4, |doc| {
                doc.insert("Log", "v4", "1");
                Ok(())
            })
            .unwrap();

        let migrated = migrator.migrate(Document::new(), 1);

        assert_eq!(migrated.get("Log", "v1"), None);
        assert_eq!(migrated.get("Log", "v3"), Some("1"));
        assert_eq!(migrated.get("Log", "v4"), None);
        assert_eq!(migrated.version(), 3);
    }

    #[test]
    fn duplicate_target_is_rejected() {
        let mut migrator = Migrator::new();
        migrator.register(1, |_| Ok(())).unwrap();

        let result = migrator.register(1, |_| Ok(()));
        assert!(matches!(result, Err(Error::DuplicateMigration(1))));
    }
}
