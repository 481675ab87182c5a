use std::collections::BTreeSet;

use alloy_primitives::Address;
use tracing::info;

use crate::errors::AutomationError;

/// Allow-list of bot addresses permitted to call one privileged entry point.
#[derive(Clone, Debug)]
pub struct BotAuth {
    owner: Address,
    callers: BTreeSet<Address>,
}

impl BotAuth {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            callers: BTreeSet::new(),
        }
    }

    pub fn is_approved(&self, caller: Address) -> bool {
        self.callers.contains(&caller)
    }

    /// Fails with `CallerNotAuthorized` unless `caller` is on the list.
    pub fn ensure_approved(&self, caller: Address) -> Result<(), AutomationError> {
        if self.is_approved(caller) {
            Ok(())
        } else {
            Err(AutomationError::CallerNotAuthorized(caller))
        }
    }

    pub fn add_caller(&mut self, sender: Address, caller: Address) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        if self.callers.insert(caller) {
            info!(%caller, "bot caller added");
        }
        Ok(())
    }

    pub fn remove_caller(&mut self, sender: Address, caller: Address) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        if self.callers.remove(&caller) {
            info!(%caller, "bot caller removed");
        }
        Ok(())
    }

    fn only_owner(&self, sender: Address) -> Result<(), AutomationError> {
        if sender != self.owner {
            return Err(AutomationError::unauthorized(sender, "bot auth owner only"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn only_owner_manages_callers() {
        let owner = address!("00000000000000000000000000000000000000ad");
        let bot = address!("00000000000000000000000000000000000000b1");
        let mut auth = BotAuth::new(owner);
        assert!(auth.add_caller(bot, bot).is_err());
        assert_eq!(
            auth.ensure_approved(bot),
            Err(AutomationError::CallerNotAuthorized(bot))
        );
        auth.add_caller(owner, bot).unwrap();
        assert!(auth.is_approved(bot));
        auth.remove_caller(owner, bot).unwrap();
        assert!(!auth.is_approved(bot));
    }
}
