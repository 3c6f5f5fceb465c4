/// Real git repositories in temporary directories for integration tests
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub struct RepositoryFixture {
    dir: TempDir,
}

#[allow(dead_code)]
impl RepositoryFixture {
    /// Empty repository on branch `main` with a local identity configured.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let fixture = Self { dir };
        fixture.git(&["init", "-q"]);
        fixture.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        fixture.git(&["config", "user.name", "Rescue Test"]);
        fixture.git(&["config", "user.email", "rescue@example.com"]);
        fixture.git(&["config", "commit.gpgsign", "false"]);
        fixture
    }

    /// Repository with one commit containing README.md and src/lib.rs.
    pub fn with_commit() -> Self {
        let fixture = Self::new();
        fixture.write("README.md", "# Fixture\n");
        fixture.write("src/lib.rs", "pub fn answer() -> u32 { 42 }\n");
        fixture.commit_all("Initial commit");
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_dir(&self) -> PathBuf {
        self.dir.path().join(".git")
    }

    /// Run git and return trimmed stdout, panicking on failure.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, content).expect("write file");
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative)).expect("read file")
    }

    pub fn commit_all(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
        self.head()
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn branch(&self) -> String {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Create a file under `.git` whose modification time lies `age` in the past.
    pub fn aged_git_file(&self, relative: &str, age: Duration) -> PathBuf {
        let path = self.git_dir().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, "").expect("write lock file");
        let file = std::fs::File::options().write(true).open(&path).expect("open lock file");
        file.set_modified(SystemTime::now() - age).expect("set mtime");
        path
    }
}
