//! Deterministic domain fixtures.
//!
//! Keys are derived from a single byte so tests can refer to "provider 3"
//! and get the same key everywhere.

use tonbag_core::{
    ContentKey, ContentScope, ContractSnapshot, OwnerAddress, ProofMetadata, Provider,
    ProviderDraft, ProviderKey, ProviderRates, ProviderStatus, RemoteProvider,
    TunnelRouteProposal, TunnelSection,
};

/// Content key `n`.
pub fn content_key(n: u8) -> ContentKey {
    ContentKey::from_bytes([n; 32])
}

/// Provider key `n`.
pub fn provider_key(n: u8) -> ProviderKey {
    let mut bytes = [n; 32];
    bytes[0] = 0xfe;
    ProviderKey::from_bytes(bytes)
}

/// The default wallet.
pub fn owner() -> OwnerAddress {
    OwnerAddress::parse("EQD4FPq-PRDieyQKkizFTRtSDyucUIqrj0v_zXJmqaDp6_0t").unwrap()
}

/// Another wallet.
pub fn other_owner() -> OwnerAddress {
    OwnerAddress::parse("EQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XggGG").unwrap()
}

/// Scope of content `n` with [`owner`] bound.
pub fn bound_scope(n: u8) -> ContentScope {
    ContentScope::bound(content_key(n), owner())
}

/// Scope of content `n` with no wallet.
pub fn unbound_scope(n: u8) -> ContentScope {
    ContentScope::unbound(content_key(n))
}

/// Submission payload of provider `n`.
pub fn draft(n: u8) -> ProviderDraft {
    draft_for(&provider_key(n))
}

fn draft_for(key: &ProviderKey) -> ProviderDraft {
    ProviderDraft {
        key: key.clone(),
        max_span: 86_400,
        price_per_mb_day: "0.000001".to_string(),
    }
}

/// Quoted figures of provider `n`.
pub fn proof(n: u8) -> ProofMetadata {
    ProofMetadata {
        last_proof: format!("{n}m ago"),
        span: "1 day".to_string(),
        price_per_day: "0.01 TON".to_string(),
        price_per_proof: "0.01 TON".to_string(),
    }
}

/// Remote entry of provider `n` with `status`.
pub fn remote(n: u8, status: &str) -> RemoteProvider {
    RemoteProvider {
        key: provider_key(n),
        proof: proof(n),
        status: ProviderStatus::parse(status),
        reason: String::new(),
        peer: None,
        draft: draft(n),
    }
}

/// Locally proposed provider `n`.
pub fn proposed(n: u8) -> Provider {
    Provider::proposed(draft(n), proof(n))
}

/// Successful rates answer for provider `n`.
pub fn offer(n: u8) -> ProviderRates {
    offer_for(&provider_key(n))
}

/// Successful rates answer for `key`.
pub fn offer_for(key: &ProviderKey) -> ProviderRates {
    ProviderRates {
        success: true,
        reason: String::new(),
        provider: Some(RemoteProvider {
            key: key.clone(),
            proof: ProofMetadata {
                last_proof: String::new(),
                span: "1 day".to_string(),
                price_per_day: "0.01 TON".to_string(),
                price_per_proof: "0.01 TON".to_string(),
            },
            status: ProviderStatus::Pending,
            reason: String::new(),
            peer: None,
            draft: draft_for(key),
        }),
    }
}

/// Snapshot of a deployed contract holding `providers`.
pub fn deployed(providers: Vec<RemoteProvider>) -> ContractSnapshot {
    ContractSnapshot::deployed("EQcontract", providers, "1.5 TON")
}

/// Route of `sections` hops, the last one outer. Its id is `sections`.
pub fn proposal(sections: usize) -> TunnelRouteProposal {
    TunnelRouteProposal {
        id: sections as u64,
        sections: (0..sections)
            .map(|i| {
                let name = format!("node-{i}");
                if i + 1 == sections {
                    TunnelSection::outer(name)
                } else {
                    TunnelSection::inner(name)
                }
            })
            .collect(),
        price_per_mb_in: "0.0001".to_string(),
        price_per_mb_out: "0.0002".to_string(),
    }
}
