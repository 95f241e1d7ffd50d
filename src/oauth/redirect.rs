use anyhow::Result;
use url::Url;

/// Navigates the hosting shell to the authorization page.
///
/// The page lifecycle ends here: whatever comes back arrives later as a new
/// location handed to `complete_link_if_present`.
pub trait Redirector {
    fn redirect(&self, url: &Url) -> Result<()>;
}

/// For shells without a browser: prints the URL for the user to open.
pub struct PrintRedirector;

impl Redirector for PrintRedirector {
    fn redirect(&self, url: &Url) -> Result<()> {
        log::info!("open this address to link the fitness account: {url}");
        println!("{url}");
        Ok(())
    }
}
