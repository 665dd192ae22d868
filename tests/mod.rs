//! Main test module for musdex
//!
//! This module includes all test suites:
//! - Integration tests for extract/combine/add/remove scenarios
//! - Property-based tests for staleness invariants

pub mod integration;

#[cfg(test)]
mod edge_cases {
    use super::integration::{stamp, MusdexTestHarness};
    use ::musdex::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_empty_configuration() {
        let harness = MusdexTestHarness::new();

        let report = harness.musdex().extract(&[], false).unwrap();
        assert!(report.archives_processed.is_empty());
        assert!(!report.index_saved);

        let report = harness.musdex().combine(&[], false).unwrap();
        assert!(report.archives_processed.is_empty());
    }

    #[test]
    fn test_similar_directory_names_do_not_mix() -> anyhow::Result<()> {
        let harness = MusdexTestHarness::new();
        harness.write_zip("a.zip", &[("x.txt", "x", stamp(1))], stamp(30))?;
        harness.write_zip("a.zip2", &[("z.txt", "z", stamp(1))], stamp(30))?;
        harness.configure_archives(&["a.zip", "a.zip2"]);
        harness.musdex().extract(&[], false).unwrap();

        harness.write_zip("a.zip", &[], stamp(40))?;
        let report = harness.musdex().extract(&[], false).unwrap();

        // only a.zip's member is gone; a.zip2 was not touched
        assert_eq!(report.files_removed, 1);
        assert_eq!(
            harness.vcs.removed(),
            vec![PathBuf::from("_musdex/a.zip/x.txt")]
        );
        assert!(harness.vcs.is_tracked("_musdex/a.zip2/z.txt"));
        Ok(())
    }

    #[test]
    fn test_unicode_and_space_names() -> anyhow::Result<()> {
        let harness = MusdexTestHarness::new();
        harness.write_zip(
            "docs/my report.zip",
            &[("файл.txt", "кириллица", stamp(1)), ("with space.xml", "<a/>", stamp(1))],
            stamp(30),
        )?;
        harness.configure_archives(&["docs/my report.zip"]);

        harness.musdex().extract(&[], false).unwrap();
        assert_eq!(
            harness.read_file("_musdex/docs/my report.zip/файл.txt"),
            "кириллица"
        );

        harness.write_file("_musdex/docs/my report.zip/with space.xml", "<b/>", stamp(60));
        harness.musdex().combine(&[], false).unwrap();
        let entries = harness.read_zip("docs/my report.zip")?;
        assert!(entries.contains(&("with space.xml".to_string(), "<b/>".to_string())));
        assert!(entries.contains(&("файл.txt".to_string(), "кириллица".to_string())));
        Ok(())
    }

    #[test]
    fn test_extracted_mtimes_match_entries() -> anyhow::Result<()> {
        let harness = MusdexTestHarness::new();
        harness.write_zip("a.zip", &[("x.txt", "x", stamp(7))], stamp(30))?;
        harness.configure_archives(&["a.zip"]);
        harness.musdex().extract(&[], false).unwrap();

        let extracted = harness.path("_musdex/a.zip/x.txt");
        assert_eq!(utils::mtime(&extracted).unwrap(), stamp(7));
        Ok(())
    }

    #[test]
    fn test_broken_config_is_reported() {
        let harness = MusdexTestHarness::new();
        fs::create_dir_all(harness.path("_musdex")).unwrap();
        fs::write(
            harness.path("_musdex/musdex.yaml"),
            "archives:\n  - filename: a.zip\n  - filename: a.zip\n",
        )
        .unwrap();

        let err = MusdexBuilder::new()
            .vcs(Box::new(harness.vcs.clone()))
            .build(harness.root())
            .unwrap_err();
        assert!(matches!(err, MusdexError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_alternate_config_file() -> anyhow::Result<()> {
        let harness = MusdexTestHarness::new();
        harness.write_zip("a.zip", &[("x.txt", "x", stamp(1))], stamp(30))?;

        let mut musdex = MusdexBuilder::new()
            .config_file("settings/musdex.yaml")
            .vcs(Box::new(harness.vcs.clone()))
            .build(harness.root())
            .unwrap();
        musdex
            .add(&[PathBuf::from("a.zip")], &AddOptions::default())
            .unwrap();

        assert!(harness.path("settings/musdex.yaml").exists());
        assert!(!harness.path("_musdex/musdex.yaml").exists());
        assert!(harness.vcs.is_tracked("settings/musdex.yaml"));
        assert!(Path::new(&harness.path("_musdex/a.zip/x.txt")).exists());
        Ok(())
    }
}

// Re-export test utilities for use in other suites
pub use integration::{MemoryVcs, MusdexTestHarness};
