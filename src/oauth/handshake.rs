use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use log::{debug, info};
use serde::Serialize;
use url::{form_urlencoded, Url};

use super::{LinkStore, Redirector};
use crate::{error::SyncError, models::Profile};

pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const FITNESS_READ_SCOPE: &str = "https://www.googleapis.com/auth/fitness.activity.read";

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub auth_url: Url,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
}

/// Bearer token captured from the redirect fragment. Never validated locally.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    secret: String,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
}

impl BearerToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_type: None,
            expires_in: None,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("secret", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkState {
    Unlinked,
    AwaitingRedirect,
    /// A token is held in memory for this session.
    Linked,
}

/// Implicit-grant handshake with the fitness provider, tracked per profile.
pub struct OAuthHandshake {
    config: OAuthConfig,
    links: LinkStore,
    pending: HashSet<Profile>,
    tokens: HashMap<Profile, BearerToken>,
}

impl OAuthHandshake {
    pub fn new(config: OAuthConfig, links: LinkStore) -> Self {
        Self {
            config,
            links,
            pending: HashSet::new(),
            tokens: HashMap::new(),
        }
    }

    pub fn state(&self, profile: Profile) -> LinkState {
        if self.tokens.contains_key(&profile) {
            LinkState::Linked
        } else if self.pending.contains(&profile) {
            LinkState::AwaitingRedirect
        } else {
            LinkState::Unlinked
        }
    }

    /// Durable flag: true once a token has ever been observed for `profile`.
    pub fn is_connected(&self, profile: Profile) -> bool {
        self.links.is_linked(profile)
    }

    pub fn token(&self, profile: Profile) -> Option<&BearerToken> {
        self.tokens.get(&profile)
    }

    pub fn authorization_url(&self) -> Url {
        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("scope", &self.config.scope)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "token")
            .append_pair("client_id", &self.config.client_id);
        url
    }

    /// Sends the shell to the authorization page. No request is made from here.
    pub fn begin_link(
        &mut self,
        profile: Profile,
        redirector: &dyn Redirector,
    ) -> Result<Url, SyncError> {
        let url = self.authorization_url();
        redirector
            .redirect(&url)
            .map_err(|err| SyncError::transport("redirect", format!("{err:#}")))?;
        info!("awaiting fitness authorization for {profile}");
        self.pending.insert(profile);
        Ok(url)
    }

    /// Picks up `access_token` from the location fragment, if the provider put
    /// one there. Without a token nothing changes, so repeated calls are harmless.
    pub fn complete_link_if_present(
        &mut self,
        location: &str,
        profile: Profile,
    ) -> Result<Option<BearerToken>, SyncError> {
        let Some(token) = token_from_location(location) else {
            debug!("no access token in return location for {profile}");
            return Ok(None);
        };

        self.links.mark_linked(profile)?;
        self.pending.remove(&profile);
        self.tokens.insert(profile, token.clone());
        info!("fitness account linked for {profile}");
        Ok(Some(token))
    }
}

fn token_from_location(location: &str) -> Option<BearerToken> {
    let (_, fragment) = location.split_once('#')?;

    let mut token: Option<BearerToken> = None;
    let mut token_type = None;
    let mut expires_in = None;
    for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
        match &*key {
            "access_token" if !value.is_empty() => token = Some(BearerToken::new(value)),
            "token_type" => token_type = Some(value.into_owned()),
            "expires_in" => expires_in = value.parse().ok(),
            _ => {}
        }
    }

    token.map(|token| BearerToken {
        token_type,
        expires_in,
        ..token
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct CapturingRedirector(RefCell<Vec<Url>>);

    impl Redirector for CapturingRedirector {
        fn redirect(&self, url: &Url) -> anyhow::Result<()> {
            self.0.borrow_mut().push(url.clone());
            Ok(())
        }
    }

    fn handshake(dir: &TempDir) -> OAuthHandshake {
        let config = OAuthConfig {
            auth_url: Url::parse(DEFAULT_AUTH_URL).unwrap(),
            client_id: "client-123".into(),
            redirect_uri: "http://localhost:3000".into(),
            scope: FITNESS_READ_SCOPE.into(),
        };
        let links = LinkStore::new(dir.path().join("settings.json")).unwrap();
        OAuthHandshake::new(config, links)
    }

    #[test]
    fn authorization_url_requests_an_implicit_token() {
        let dir = TempDir::new().unwrap();
        let url = handshake(&dir).authorization_url();

        assert_eq!(url.path(), "/o/oauth2/v2/auth");
        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "token");
        assert_eq!(pairs["client_id"], "client-123");
        assert_eq!(pairs["redirect_uri"], "http://localhost:3000");
        assert_eq!(pairs["scope"], FITNESS_READ_SCOPE);
    }

    #[test]
    fn begin_link_redirects_and_waits() {
        let dir = TempDir::new().unwrap();
        let mut handshake = handshake(&dir);
        let redirector = CapturingRedirector(RefCell::new(Vec::new()));

        let url = handshake.begin_link(Profile::Mom, &redirector).unwrap();
        assert_eq!(redirector.0.borrow().as_slice(), &[url]);
        assert_eq!(handshake.state(Profile::Mom), LinkState::AwaitingRedirect);
        assert_eq!(handshake.state(Profile::Dad), LinkState::Unlinked);
    }

    #[test]
    fn token_fragment_links_the_profile() {
        let dir = TempDir::new().unwrap();
        let mut handshake = handshake(&dir);

        let token = handshake
            .complete_link_if_present(
                "http://localhost:3000/#access_token=ya29.abc&token_type=Bearer&expires_in=3599",
                Profile::Dad,
            )
            .unwrap()
            .unwrap();
        assert_eq!(token.secret(), "ya29.abc");
        assert_eq!(token.expires_in, Some(3599));
        assert_eq!(handshake.state(Profile::Dad), LinkState::Linked);
        assert!(handshake.is_connected(Profile::Dad));
        assert!(!handshake.is_connected(Profile::Mom));

        let reopened = LinkStore::new(dir.path().join("settings.json")).unwrap();
        assert!(reopened.is_linked(Profile::Dad));
    }

    #[test]
    fn missing_fragment_is_a_no_op_every_time() {
        let dir = TempDir::new().unwrap();
        let mut handshake = handshake(&dir);

        for _ in 0..2 {
            let result = handshake
                .complete_link_if_present("http://localhost:3000/dashboard", Profile::Son)
                .unwrap();
            assert!(result.is_none());
            assert!(!handshake.is_connected(Profile::Son));
            assert_eq!(handshake.state(Profile::Son), LinkState::Unlinked);
        }
        assert!(!dir.path().join("settings.json").exists());
    }

    #[test]
    fn unsaved_link_keeps_the_profile_unlinked() {
        let dir = TempDir::new().unwrap();
        let mut handshake = handshake(&dir);
        std::fs::create_dir(dir.path().join("settings.json")).unwrap();

        let result = handshake.complete_link_if_present("#access_token=tok", Profile::Mom);
        assert!(matches!(result, Err(SyncError::Storage(_))));
        assert!(!handshake.is_connected(Profile::Mom));
        assert_eq!(handshake.state(Profile::Mom), LinkState::Unlinked);
    }

    #[test]
    fn bare_hash_and_odd_locations_are_handled() {
        assert_eq!(
            token_from_location("#access_token=tok").unwrap().secret(),
            "tok"
        );
        assert!(token_from_location("#access_token=").is_none());
        assert!(token_from_location("#error=access_denied").is_none());
        assert!(token_from_location("not a url").is_none());
        assert_eq!(
            token_from_location("/callback#access_token=tok&token_type=Bearer")
                .unwrap()
                .secret(),
            "tok"
        );
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", BearerToken::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
