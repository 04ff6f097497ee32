//! Session state for the whole client.
//!
//! The auth gateway's subscription callback is the single writer of the
//! current session; every other component reads through the provider and
//! never mutates it directly.

use std::sync::{Arc, RwLock};

use crate::gateway::{AuthGateway, AuthUser};

pub struct SessionProvider {
    gateway: Arc<dyn AuthGateway>,
    current: Arc<RwLock<Option<AuthUser>>>,
}

impl SessionProvider {
    /// Reads the initial session, then keeps local state in sync via the
    /// gateway's session-change subscription.
    pub async fn new(gateway: Arc<dyn AuthGateway>) -> Arc<Self> {
        let current = Arc::new(RwLock::new(gateway.session().await));

        let writer = current.clone();
        gateway.subscribe(Box::new(move |user| {
            *writer.write().unwrap() = user;
        }));

        Arc::new(Self { gateway, current })
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.current.read().unwrap().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.current.read().unwrap().as_ref().map(|u| u.id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().unwrap().is_some()
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> bool {
        match self.gateway.sign_up(email, password).await {
            Ok(_) => true,
            Err(e) => {
                log::error!("sign-up failed: {e}");
                false
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> bool {
        match self.gateway.sign_in(email, password).await {
            Ok(_) => true,
            Err(e) => {
                log::error!("sign-in failed: {e}");
                false
            }
        }
    }

    pub async fn sign_out(&self) -> bool {
        match self.gateway.sign_out().await {
            Ok(()) => true,
            Err(e) => {
                log::error!("sign-out failed: {e}");
                false
            }
        }
    }
}
