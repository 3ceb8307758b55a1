use crate::{Context, Error, ProvideCredential, Result, SignRequest, SigningCredential};
use log::debug;
use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex};

/// Signer is the main struct used to sign the request.
///
/// The credential is resolved once by [`Signer::new`] and cached for the life
/// of the signer. It is only resolved again if it reports itself invalid, which
/// happens when a temporary credential passes its expiry.
#[derive(Clone)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<Option<K>>>,
}

impl<K: SigningCredential> Debug for Signer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("provider", &self.provider)
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer and resolve its credential.
    ///
    /// Fails with a credential error if no provider yields a credential.
    pub async fn new(
        ctx: Context,
        provider: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Result<Self> {
        let credential = provider.provide_credential(&ctx).await?.ok_or_else(|| {
            Error::credential_invalid("no credential could be resolved from the environment")
        })?;
        debug!("signer resolved credential: {credential:?}");

        Ok(Self {
            ctx,
            provider: Arc::new(provider),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(Some(credential))),
        })
    }

    /// Sign the request with the cached credential.
    ///
    /// `payload` must be the exact bytes that will be sent.
    pub async fn sign(&self, req: &mut http::request::Parts, payload: Option<&[u8]>) -> Result<()> {
        let cached = self.cached()?;
        let credential = if cached.is_valid() {
            cached
        } else {
            debug!("cached credential is no longer valid, resolving again");
            let fresh = self.provider.provide_credential(&self.ctx).await?;
            if !fresh.is_valid() {
                return Err(Error::credential_expired(
                    "credential expired and could not be refreshed",
                ));
            }
            *self.lock()? = fresh.clone();
            fresh
        };

        self.builder
            .sign_request(&self.ctx, req, payload, credential.as_ref())
            .await
    }

    fn cached(&self) -> Result<Option<K>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<K>>> {
        self.credential
            .lock()
            .map_err(|_| Error::unexpected("credential cache lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug)]
    struct Token {
        value: String,
        valid: bool,
    }

    impl SigningCredential for Token {
        fn is_valid(&self) -> bool {
            self.valid
        }
    }

    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        first_valid: bool,
    }

    #[async_trait]
    impl ProvideCredential for CountingProvider {
        type Credential = Token;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Token>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Token {
                value: format!("token-{n}"),
                valid: n > 0 || self.first_valid,
            }))
        }
    }

    #[derive(Debug)]
    struct NoneProvider;

    #[async_trait]
    impl ProvideCredential for NoneProvider {
        type Credential = Token;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Token>> {
            Ok(None)
        }
    }

    #[derive(Debug)]
    struct HeaderSigner;

    #[async_trait]
    impl SignRequest for HeaderSigner {
        type Credential = Token;

        async fn sign_request(
            &self,
            _: &Context,
            req: &mut http::request::Parts,
            _: Option<&[u8]>,
            cred: Option<&Token>,
        ) -> Result<()> {
            let cred = cred.ok_or_else(|| Error::credential_invalid("missing"))?;
            req.headers.insert("x-token", cred.value.parse()?);
            Ok(())
        }
    }

    fn parts() -> http::request::Parts {
        http::Request::get("https://example.com/")
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_credential_resolved_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            calls: calls.clone(),
            first_valid: true,
        };
        let signer = Signer::new(Context::new(), provider, HeaderSigner)
            .await
            .expect("signer must build");

        for _ in 0..3 {
            let mut req = parts();
            signer.sign(&mut req, None).await.expect("sign must succeed");
            assert_eq!(req.headers["x-token"], "token-0");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_credential_is_refreshed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            calls: calls.clone(),
            first_valid: false,
        };
        let signer = Signer::new(Context::new(), provider, HeaderSigner)
            .await
            .expect("signer must build");

        let mut req = parts();
        signer.sign(&mut req, None).await.expect("sign must succeed");
        assert_eq!(req.headers["x-token"], "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let err = Signer::new(Context::new(), NoneProvider, HeaderSigner)
            .await
            .expect_err("signer must not build");
        assert!(err.is_credential_error());
    }
}
