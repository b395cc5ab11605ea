//! Demo service - manage demo mode
//!
//! Demo mode swaps the HTTP gateway for the local demo gateway so the
//! client can be tried without a receipt service.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::adapters::demo::{DemoGateway, DEMO_RECEIPTS_FILE};
use crate::config::Config;

pub struct DemoService {
    receipts_dir: PathBuf,
}

impl DemoService {
    pub fn new(receipts_dir: &Path) -> Self {
        Self {
            receipts_dir: receipts_dir.to_path_buf(),
        }
    }

    pub fn is_enabled(&self) -> Result<bool> {
        let config = Config::load(&self.receipts_dir)?;
        Ok(config.demo_mode)
    }

    /// Enable demo mode with freshly generated demo receipts
    pub fn enable(&self) -> Result<()> {
        let mut config = Config::load(&self.receipts_dir).unwrap_or_default();
        config.enable_demo_mode();
        config.save(&self.receipts_dir)?;

        DemoGateway::reset(&self.receipts_dir)?;
        Ok(())
    }

    /// Disable demo mode, optionally deleting the demo receipts
    pub fn disable(&self, clean: bool) -> Result<()> {
        let mut config = Config::load(&self.receipts_dir).unwrap_or_default();
        config.disable_demo_mode();
        config.save(&self.receipts_dir)?;

        if clean {
            let demo_file = self.receipts_dir.join(DEMO_RECEIPTS_FILE);
            if demo_file.exists() {
                std::fs::remove_file(&demo_file)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_enable_and_disable() {
        let dir = tempdir().unwrap();
        let service = DemoService::new(dir.path());

        service.enable().unwrap();
        assert!(dir.path().join(DEMO_RECEIPTS_FILE).exists());
        let saved = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert!(saved.contains("\"demoMode\": true"));

        service.disable(true).unwrap();
        assert!(!dir.path().join(DEMO_RECEIPTS_FILE).exists());
        let saved = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert!(saved.contains("\"demoMode\": false"));
    }
}
