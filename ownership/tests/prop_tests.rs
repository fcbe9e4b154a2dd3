use proptest::prelude::*;
use std::collections::HashSet;

use credscore_ownership::{OwnershipRegistry, TokenLedger};
use credscore_types::{Identity, TokenId};

#[derive(Clone, Debug)]
enum Op {
    Mint(u8),
    Transfer { from: u8, to: u8, token: u64 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Mint),
        (0u8..8, 0u8..8, 1u64..10).prop_map(|(from, to, token)| Op::Transfer { from, to, token }),
    ]
}

fn who(n: u8) -> Identity {
    Identity::new(format!("acct-{n}"))
}

proptest! {
    /// Whatever sequence of mints and transfers is attempted, no identity
    /// ever ends up holding two tokens and both index directions agree.
    #[test]
    fn ownership_stays_one_to_one(ops in prop::collection::vec(op(), 0..64)) {
        let ledger = TokenLedger::new();
        for op in ops {
            match op {
                Op::Mint(n) => { let _ = ledger.mint(&who(n)); }
                Op::Transfer { from, to, token } => {
                    let _ = ledger.transfer(&who(from), &who(to), TokenId::new(token));
                }
            }
        }

        let snap = ledger.snapshot();
        let mut owners = HashSet::new();
        for (token, owner) in &snap.entries {
            prop_assert!(owners.insert(owner.clone()), "{} holds two tokens", owner);
            prop_assert_eq!(ledger.token_of(owner).unwrap(), Some(*token));
            prop_assert_eq!(&ledger.owner_of(*token).unwrap(), owner);
        }
    }
}
