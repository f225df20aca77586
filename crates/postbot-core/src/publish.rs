//! Publication flow: branch, two file writes, pull request.
//!
//! Steps run strictly in order and the first failure aborts the rest. Nothing
//! is rolled back, so a failed run can leave an orphaned branch or a
//! half-written post behind.

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    hosting::{NewPullRequest, PullRequest, PutFile, RepoHost},
    package::{ContentPackage, LocaleBlock},
    Result,
};

pub const BRANCH_PREFIX: &str = "post/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publication {
    pub branch: String,
    pub paths: Vec<String>,
    pub pull_request: PullRequest,
}

pub struct Publisher<'a> {
    repo: &'a dyn RepoHost,
    base_branch: &'a str,
    content_root: &'a str,
}

impl<'a> Publisher<'a> {
    pub fn new(repo: &'a dyn RepoHost, base_branch: &'a str, content_root: &'a str) -> Self {
        Self {
            repo,
            base_branch,
            content_root,
        }
    }

    pub async fn publish(&self, pkg: &ContentPackage) -> Result<Publication> {
        let head = self.repo.get_ref(self.base_branch).await?;

        let branch = branch_name(&pkg.slug);
        let branch = match self.repo.create_ref(&branch, &head).await {
            Ok(()) => branch,
            Err(e) if e.is_conflict() => {
                let retry = suffixed_branch_name(&pkg.slug, Utc::now().timestamp_millis());
                warn!(%branch, %retry, "branch exists, retrying with suffix");
                self.repo.create_ref(&retry, &head).await?;
                retry
            }
            Err(e) => return Err(e),
        };
        info!(%branch, base = self.base_branch, sha = %head.0, "branch created");

        let mut paths = Vec::with_capacity(2);
        for block in pkg.blocks() {
            let path = pkg.path_for(self.content_root, block.locale);
            self.repo
                .put_file(PutFile {
                    path: path.clone(),
                    message: commit_message(block, &pkg.slug),
                    content: block.file_contents(),
                    branch: branch.clone(),
                })
                .await?;
            info!(%branch, %path, "file written");
            paths.push(path);
        }

        let pull_request = self
            .repo
            .create_pull_request(NewPullRequest {
                title: pr_title(&pkg.slug),
                head: branch.clone(),
                base: self.base_branch.to_string(),
                body: pr_body(&pkg.slug, &paths),
            })
            .await?;
        info!(number = pull_request.number, url = %pull_request.url, "pull request opened");

        Ok(Publication {
            branch,
            paths,
            pull_request,
        })
    }
}

pub fn branch_name(slug: &str) -> String {
    format!("{BRANCH_PREFIX}{slug}")
}

pub fn suffixed_branch_name(slug: &str, unix_millis: i64) -> String {
    format!("{BRANCH_PREFIX}{slug}-{unix_millis}")
}

fn commit_message(block: &LocaleBlock, slug: &str) -> String {
    format!("Add {} post {slug}", block.locale.code())
}

pub fn pr_title(slug: &str) -> String {
    format!("New post: {slug}")
}

pub fn pr_body(slug: &str, paths: &[String]) -> String {
    let files = paths
        .iter()
        .map(|p| format!("- `{p}`"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Post `{slug}` submitted from Telegram.\n\n\
         ### Files\n{files}\n\n\
         ### Review checklist\n\
         - [ ] Title, date and excerpt are correct in both locales\n\
         - [ ] Both versions say the same thing\n\
         - [ ] Links and images resolve\n\
         - [ ] Preview deployment renders the article\n"
    )
}
