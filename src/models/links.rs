//! Canonical API links embedded in responses.
//!
//! Every record points back at this API for itself and for nested objects,
//! so clients can navigate the graph purely through returned URLs.

use crate::git::store::ObjectKind;

pub struct ApiUrls<'a> {
    base: &'a str,
    repo: &'a str,
}

impl<'a> ApiUrls<'a> {
    pub fn new(base: &'a str, repo: &'a str) -> Self {
        Self {
            base: base.trim_end_matches('/'),
            repo,
        }
    }

    pub fn repo(&self) -> String {
        format!("{}/repos/{}/", self.base, self.repo)
    }

    pub fn commit(&self, sha: &str) -> String {
        format!("{}/repos/{}/git/commits/{}/", self.base, self.repo, sha)
    }

    pub fn tree(&self, sha: &str) -> String {
        format!("{}/repos/{}/git/trees/{}/", self.base, self.repo, sha)
    }

    pub fn blob(&self, sha: &str) -> String {
        format!("{}/repos/{}/git/blobs/{}/", self.base, self.repo, sha)
    }

    pub fn tag(&self, sha: &str) -> String {
        format!("{}/repos/{}/git/tags/{}/", self.base, self.repo, sha)
    }

    /// Link for a ref by full name; the redundant `refs/` prefix is dropped
    /// from the path the same way GitHub does.
    pub fn reference(&self, ref_name: &str) -> String {
        let path = ref_name.strip_prefix("refs/").unwrap_or(ref_name);
        format!("{}/repos/{}/git/refs/{}", self.base, self.repo, path)
    }

    pub fn porcelain_commit(&self, refspec: &str) -> String {
        format!("{}/repos/{}/commits/{}/", self.base, self.repo, refspec)
    }

    pub fn branch(&self, name: &str) -> String {
        format!("{}/repos/{}/branches/{}/", self.base, self.repo, name)
    }

    pub fn tag_name(&self, name: &str) -> String {
        format!("{}/repos/{}/tags/{}/", self.base, self.repo, name)
    }

    pub fn contents(&self, path: &str, refspec: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}?ref={}",
            self.base, self.repo, path, refspec
        )
    }

    pub fn raw(&self, refspec: &str, path: &str) -> String {
        format!("{}/repos/{}/raw/{}/{}", self.base, self.repo, refspec, path)
    }

    pub fn object(&self, kind: ObjectKind, sha: &str) -> String {
        match kind {
            ObjectKind::Commit => self.commit(sha),
            ObjectKind::Tree => self.tree(sha),
            ObjectKind::Blob => self.blob(sha),
            ObjectKind::Tag => self.tag(sha),
        }
    }
}
