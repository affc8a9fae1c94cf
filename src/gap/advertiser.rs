//! Advertiser
//!
//! Thin wrapper that asks the stack to advertise the device identity and
//! logs the outcome. It keeps no state about whether advertising is active.

use crate::gap::identity::AdvertisedIdentity;
use crate::gap::traits::{AdvertisingError, AdvertisingParams, GapStack};

pub struct Advertiser {
    identity: AdvertisedIdentity,
    params: AdvertisingParams,
}

impl Advertiser {
    pub fn new(identity: AdvertisedIdentity, params: AdvertisingParams) -> Self {
        Self { identity, params }
    }

    pub fn identity(&self) -> &AdvertisedIdentity {
        &self.identity
    }

    pub fn params(&self) -> &AdvertisingParams {
        &self.params
    }

    /// Request one advertising start
    pub async fn start<S: GapStack>(&self, stack: &mut S) -> Result<(), AdvertisingError> {
        match stack.advertise_start(&self.identity, &self.params).await {
            Ok(()) => {
                log::info!("ADV: advertising as '{}'", self.identity.name());
                Ok(())
            }
            Err(e) => {
                log::error!("ADV: start failed ({:?})", e);
                Err(e)
            }
        }
    }
}

impl Default for Advertiser {
    fn default() -> Self {
        Self::new(AdvertisedIdentity::default(), AdvertisingParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::traits::mock::MockGapStack;
    use futures::executor::block_on;

    #[test]
    fn test_start_passes_identity_and_params() {
        let identity = AdvertisedIdentity::new("Pulse").unwrap();
        let params = AdvertisingParams {
            interval_min_ms: 30,
            interval_max_ms: 60,
        };
        let advertiser = Advertiser::new(identity, params);
        let mut stack = MockGapStack::new();

        assert_eq!(block_on(advertiser.start(&mut stack)), Ok(()));

        let starts = stack.starts();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].name.as_str(), "Pulse");
        assert!(starts[0].connectable);
        assert_eq!(starts[0].params, params);
    }

    #[test]
    fn test_start_failure_is_returned() {
        let advertiser = Advertiser::default();
        let mut stack = MockGapStack::new();
        stack.fail_next_start(AdvertisingError::Busy);

        assert_eq!(block_on(advertiser.start(&mut stack)), Err(AdvertisingError::Busy));
        assert_eq!(stack.start_count(), 1);
    }
}
