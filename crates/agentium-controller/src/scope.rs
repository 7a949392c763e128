//! Package-scope enforcement over the working tree.
//!
//! After an agent run, `git status --porcelain` is parsed and every
//! modified or untracked path must sit under the configured package path,
//! with a short exemption list for workspace-level files a package change
//! legitimately touches.

use agentium_core::{AgentiumError, AgentiumResult};
use std::path::Path;
use tracing::{info, warn};

/// Paths allowed outside the package scope.
const EXEMPT_FILES: [&str; 3] = ["package.json", "pnpm-lock.yaml", "pnpm-workspace.yaml"];
const EXEMPT_PREFIX: &str = ".github/workflows/";

/// Validates that agent edits stay inside one package of the repository.
pub struct ScopeValidator {
    package_path: String,
}

impl ScopeValidator {
    pub fn new(package_path: impl Into<String>) -> Self {
        let mut package_path = package_path.into();
        while package_path.ends_with('/') {
            package_path.pop();
        }
        Self { package_path }
    }

    /// Paths from a `git status --porcelain` document that violate the
    /// scope. Rename entries (`old -> new`) are checked on both sides.
    pub fn violations(&self, porcelain: &str) -> Vec<String> {
        let mut violations = Vec::new();
        for line in porcelain.lines() {
            if line.len() < 4 {
                continue;
            }
            let paths = &line[3..];
            for path in paths.split(" -> ") {
                let path = path.trim().trim_matches('"');
                if path.is_empty() {
                    continue;
                }
                if !self.is_allowed(path) {
                    violations.push(path.to_string());
                }
            }
        }
        violations
    }

    fn is_allowed(&self, path: &str) -> bool {
        if EXEMPT_FILES.contains(&path) || path.starts_with(EXEMPT_PREFIX) {
            return true;
        }
        path.starts_with(&format!("{}/", self.package_path))
    }

    /// Run `git status --porcelain` in the working tree and report
    /// violations.
    pub async fn check(&self, work_dir: &Path) -> AgentiumResult<Vec<String>> {
        let output = tokio::process::Command::new("git")
            .args(["status", "--porcelain", "--untracked-files=all"])
            .current_dir(work_dir)
            .output()
            .await
            .map_err(|e| AgentiumError::Controller(format!("git status failed: {e}")))?;

        if !output.status.success() {
            return Err(AgentiumError::Controller(format!(
                "git status exited {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let violations = self.violations(&String::from_utf8_lossy(&output.stdout));
        if !violations.is_empty() {
            warn!(count = violations.len(), "Out-of-scope changes detected");
        }
        Ok(violations)
    }

    /// Throw away every uncommitted change and untracked file
    /// (`git checkout . && git clean -fd`).
    pub async fn restore(&self, work_dir: &Path) -> AgentiumResult<()> {
        for args in [["checkout", "."].as_slice(), ["clean", "-fd"].as_slice()] {
            let output = tokio::process::Command::new("git")
                .args(args)
                .current_dir(work_dir)
                .output()
                .await
                .map_err(|e| AgentiumError::Controller(format!("git {args:?} failed: {e}")))?;
            if !output.status.success() {
                return Err(AgentiumError::Controller(format!(
                    "git {args:?} exited {}: {}",
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr)
                )));
            }
        }
        info!("Working tree restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ScopeValidator {
        ScopeValidator::new("packages/api")
    }

    #[test]
    fn in_scope_changes_pass() {
        let porcelain = " M packages/api/src/index.ts\n?? packages/api/src/new.ts\n";
        assert!(validator().violations(porcelain).is_empty());
    }

    #[test]
    fn out_of_scope_changes_rejected() {
        let porcelain = " M packages/api/src/index.ts\n M packages/web/src/app.tsx\n?? rogue.txt\n";
        let violations = validator().violations(porcelain);
        assert_eq!(violations, vec!["packages/web/src/app.tsx", "rogue.txt"]);
    }

    #[test]
    fn exemptions_pass_everywhere() {
        let porcelain = concat!(
            " M package.json\n",
            " M pnpm-lock.yaml\n",
            " M pnpm-workspace.yaml\n",
            " M .github/workflows/ci.yml\n",
        );
        assert!(validator().violations(porcelain).is_empty());
    }

    #[test]
    fn renames_check_both_sides() {
        let porcelain = "R  packages/api/src/a.ts -> packages/api/src/b.ts\n";
        assert!(validator().violations(porcelain).is_empty());

        let porcelain = "R  packages/api/src/a.ts -> packages/web/src/a.ts\n";
        assert_eq!(
            validator().violations(porcelain),
            vec!["packages/web/src/a.ts"]
        );
    }

    #[test]
    fn prefix_match_is_path_aware() {
        // A sibling directory sharing the prefix string is out of scope.
        let porcelain = " M packages/api-extras/src/x.ts\n";
        assert_eq!(
            validator().violations(porcelain),
            vec!["packages/api-extras/src/x.ts"]
        );
    }

    #[test]
    fn trailing_slash_in_config_is_tolerated() {
        let validator = ScopeValidator::new("packages/api/");
        assert!(validator.violations(" M packages/api/src/x.ts\n").is_empty());
    }

    #[tokio::test]
    async fn check_runs_against_a_real_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        for args in [
            ["init", "-q"].as_slice(),
            ["config", "user.email", "t@example.com"].as_slice(),
            ["config", "user.name", "t"].as_slice(),
        ] {
            let status = std::process::Command::new("git")
                .args(args)
                .current_dir(dir)
                .status()
                .unwrap();
            assert!(status.success());
        }
        std::fs::create_dir_all(dir.join("packages/api")).unwrap();
        std::fs::write(dir.join("packages/api/ok.ts"), "in scope").unwrap();
        for args in [
            ["add", "-A"].as_slice(),
            ["commit", "-q", "-m", "init"].as_slice(),
        ] {
            let status = std::process::Command::new("git")
                .args(args)
                .current_dir(dir)
                .status()
                .unwrap();
            assert!(status.success());
        }
        std::fs::write(dir.join("rogue.txt"), "out of scope").unwrap();

        let violations = validator().check(dir).await.unwrap();
        assert_eq!(violations, vec!["rogue.txt"]);

        validator().restore(dir).await.unwrap();
        assert!(!dir.join("rogue.txt").exists());
    }
}
