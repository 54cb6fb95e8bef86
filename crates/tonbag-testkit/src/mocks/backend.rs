//! Scripted storage-daemon backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tonbag_core::effects::{BackendEffects, BackendError};
use tonbag_core::{
    ContentKey, ContractSnapshot, OwnerAddress, ProviderDraft, ProviderKey, ProviderRates,
    SubmissionPayload, TonAmount,
};

use crate::fixtures;

/// Arguments of one `build_provider_submission` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionCall {
    /// Content item
    pub content: ContentKey,
    /// Authorizing wallet
    pub owner: OwnerAddress,
    /// Attached deposit
    pub amount: TonAmount,
    /// Submitted provider set
    pub providers: Vec<ProviderDraft>,
}

#[derive(Debug)]
struct BackendState {
    contracts: HashMap<ContentKey, ContractSnapshot>,
    contract_failures: VecDeque<BackendError>,
    contract_delay: Option<Duration>,
    contract_pending: bool,
    contract_requests: Vec<(ContentKey, OwnerAddress)>,
    rates: HashMap<ProviderKey, ProviderRates>,
    rates_requests: Vec<(ContentKey, ProviderKey)>,
    submission_failure: Option<BackendError>,
    submission_pending: bool,
    submissions: Vec<SubmissionCall>,
    withdrawals: Vec<(ContentKey, OwnerAddress)>,
    max_sections: u32,
    max_sections_calls: usize,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            contracts: HashMap::new(),
            contract_failures: VecDeque::new(),
            contract_delay: None,
            contract_pending: false,
            contract_requests: Vec::new(),
            rates: HashMap::new(),
            rates_requests: Vec::new(),
            submission_failure: None,
            submission_pending: false,
            submissions: Vec::new(),
            withdrawals: Vec::new(),
            max_sections: 10,
            max_sections_calls: 0,
        }
    }
}

/// Backend whose answers are set by the test.
///
/// Unscripted content items read as not deployed, unscripted providers
/// accept with [`fixtures::offer`], and submissions succeed with a payload
/// carrying both state-init and body.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<BackendState>,
}

impl MockBackend {
    /// Backend with default answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer contract fetches for `content` with `snapshot`.
    pub fn set_contract(&self, content: &ContentKey, snapshot: ContractSnapshot) {
        self.state.lock().contracts.insert(content.clone(), snapshot);
    }

    /// Fail the next contract fetch with `error`.
    pub fn fail_next_contract(&self, error: BackendError) {
        self.state.lock().contract_failures.push_back(error);
    }

    /// Delay every contract fetch by `delay`.
    pub fn set_contract_delay(&self, delay: Option<Duration>) {
        self.state.lock().contract_delay = delay;
    }

    /// Make contract fetches never complete.
    pub fn set_contract_pending(&self, pending: bool) {
        self.state.lock().contract_pending = pending;
    }

    /// Answer rate requests for `provider` with `rates`.
    pub fn set_rates(&self, provider: &ProviderKey, rates: ProviderRates) {
        self.state.lock().rates.insert(provider.clone(), rates);
    }

    /// Fail payload building with `error`, or succeed again with `None`.
    pub fn set_submission_failure(&self, error: Option<BackendError>) {
        self.state.lock().submission_failure = error;
    }

    /// Make payload building never complete.
    pub fn set_submission_pending(&self, pending: bool) {
        self.state.lock().submission_pending = pending;
    }

    /// Route length limit reported by the backend.
    pub fn set_max_sections(&self, max: u32) {
        self.state.lock().max_sections = max;
    }

    /// Contract fetches issued so far.
    pub fn contract_requests(&self) -> Vec<(ContentKey, OwnerAddress)> {
        self.state.lock().contract_requests.clone()
    }

    /// Number of contract fetches issued so far.
    pub fn contract_calls(&self) -> usize {
        self.state.lock().contract_requests.len()
    }

    /// Number of rate requests issued so far.
    pub fn rates_calls(&self) -> usize {
        self.state.lock().rates_requests.len()
    }

    /// Payload builds issued so far.
    pub fn submissions(&self) -> Vec<SubmissionCall> {
        self.state.lock().submissions.clone()
    }

    /// Withdrawal builds issued so far.
    pub fn withdrawals(&self) -> Vec<(ContentKey, OwnerAddress)> {
        self.state.lock().withdrawals.clone()
    }

    /// Number of route length queries issued so far.
    pub fn max_sections_calls(&self) -> usize {
        self.state.lock().max_sections_calls
    }

    fn payload(content: &ContentKey, amount: TonAmount, deploy: bool) -> SubmissionPayload {
        SubmissionPayload {
            destination: format!("EQcontract-{}", content.short()),
            amount,
            state_init: deploy.then(|| "te6cckstateinit".to_string()),
            body: Some("te6cckbody".to_string()),
        }
    }
}

#[async_trait]
impl BackendEffects for MockBackend {
    async fn fetch_provider_contract(
        &self,
        content: &ContentKey,
        owner: &OwnerAddress,
    ) -> Result<ContractSnapshot, BackendError> {
        let (result, delay, pending) = {
            let mut state = self.state.lock();
            state
                .contract_requests
                .push((content.clone(), owner.clone()));
            let result = match state.contract_failures.pop_front() {
                Some(error) => Err(error),
                None => Ok(state
                    .contracts
                    .get(content)
                    .cloned()
                    .unwrap_or_else(ContractSnapshot::not_deployed)),
            };
            (result, state.contract_delay, state.contract_pending)
        };
        if pending {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn fetch_provider_rates(
        &self,
        content: &ContentKey,
        provider: &ProviderKey,
    ) -> Result<ProviderRates, BackendError> {
        let mut state = self.state.lock();
        state
            .rates_requests
            .push((content.clone(), provider.clone()));
        Ok(state
            .rates
            .get(provider)
            .cloned()
            .unwrap_or_else(|| fixtures::offer_for(provider)))
    }

    async fn build_provider_submission(
        &self,
        content: &ContentKey,
        owner: &OwnerAddress,
        amount: TonAmount,
        providers: &[ProviderDraft],
    ) -> Result<SubmissionPayload, BackendError> {
        let (failure, pending, deploy) = {
            let mut state = self.state.lock();
            state.submissions.push(SubmissionCall {
                content: content.clone(),
                owner: owner.clone(),
                amount,
                providers: providers.to_vec(),
            });
            let deploy = !state
                .contracts
                .get(content)
                .is_some_and(|snapshot| snapshot.deployed);
            (state.submission_failure.clone(), state.submission_pending, deploy)
        };
        if pending {
            std::future::pending::<()>().await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(Self::payload(content, amount, deploy)),
        }
    }

    async fn build_withdrawal(
        &self,
        content: &ContentKey,
        owner: &OwnerAddress,
    ) -> Result<SubmissionPayload, BackendError> {
        let failure = {
            let mut state = self.state.lock();
            state.withdrawals.push((content.clone(), owner.clone()));
            state.submission_failure.clone()
        };
        match failure {
            Some(error) => Err(error),
            None => Ok(Self::payload(
                content,
                TonAmount::from_nanotons(30_000_000),
                false,
            )),
        }
    }

    async fn max_tunnel_sections(&self) -> Result<u32, BackendError> {
        let mut state = self.state.lock();
        state.max_sections_calls += 1;
        Ok(state.max_sections)
    }
}
