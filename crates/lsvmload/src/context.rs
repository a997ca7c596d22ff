//! Explicit boot state carried through the orchestrator, replacing the
//! process-wide globals `original_source/lsvmload/main.c` and its helpers
//! keep as file-scope statics (spec.md §9's redesign note).

use crate::config::Config;

/// Everything `S0`..`S12` (spec.md §4.O1) read or mutate, threaded through
/// [`crate::orchestrator::BootOrchestrator::run`] as a value instead of
/// living behind `static mut`.
#[derive(Debug)]
pub struct BootContext {
    pub config: Config,
    pub dry_run: bool,
    /// `S1`'s outcome: whether the scenario-tag measurement sequence
    /// completed. `false` does not abort the boot by itself — it only
    /// rules out trusting a TPM-unsealed key at `S2`/`S3`.
    pub measured_boot_ok: bool,
    /// Flipped on once, at `S9 Interpose`. Before this point the
    /// interposer must never answer a lookup — spec.md §5's reentrancy
    /// hazard, mirrored by `InterposedBdev`'s own `enable_hooks` flag.
    pub enable_hooks: bool,
    pub passphrase_attempts: u32,
}

impl BootContext {
    pub fn new(config: Config, dry_run: bool) -> Self {
        Self {
            config,
            dry_run,
            measured_boot_ok: false,
            enable_hooks: false,
            passphrase_attempts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::parse(
            "EFIVendorDir=Contoso\n\
             BootDeviceLUKS=11111111-1111-1111-1111-111111111111\n\
             RootDeviceLUKS=22222222-2222-2222-2222-222222222222\n",
        )
        .unwrap()
    }

    #[test]
    fn starts_with_hooks_disabled_and_measurement_unproven() {
        let ctx = BootContext::new(config(), false);
        assert!(!ctx.enable_hooks);
        assert!(!ctx.measured_boot_ok);
        assert_eq!(ctx.passphrase_attempts, 0);
    }
}
