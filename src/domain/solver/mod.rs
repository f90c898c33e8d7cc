//! The solve state machine: validate, price, compose, and land fills.
//!
//! The machine itself is protocol-generic; the ERC-20 and ERC-721 engines
//! plug in plan building, extra precondition checks, and the post-fill
//! token. Every attempt re-derives the price window from the current block,
//! so queue retries keep honoring the decay.

use {
    crate::{
        domain::{
            auth,
            eth::{self, BLOCK_TIME, PESSIMISTIC_BLOCK_TIME},
            intent::{self, Intent, Protocol},
            pricing,
            solution::{self, FillVariant},
        },
        infra::{
            blockchain::{self, Rpc, SignedTx},
            codec,
            contracts::Contracts,
            matchmaker::Matchmaker,
            metrics,
            queue,
            quote,
            relay,
            store::{Approval, CachedSolution, Store},
        },
        util::conv,
    },
    alloy::{
        network::TransactionBuilder,
        primitives::keccak256,
        rpc::types::TransactionRequest,
        signers::local::PrivateKeySigner,
    },
    std::sync::{Arc, OnceLock},
    tracing::Instrument,
    uuid::Uuid,
};

pub mod economics;
mod erc20;
mod erc721;

pub use {erc20::Erc20, erc721::Erc721};

/// A queued solve attempt.
#[derive(Clone, Debug)]
pub struct SolveJob {
    pub intent: Intent,
    /// The maker's approval carrier, when the intent travelled on one.
    pub approval: Option<Approval>,
    /// A previously computed plan, short-circuiting the quote step.
    pub plan: Option<solution::Plan>,
    /// Present once the matchmaker has answered.
    pub authorization: Option<auth::Signed>,
}

/// The deduplication key for solve jobs: the intent hash concatenated with
/// the authorization hash, or an empty string in its place. The same intent
/// may run with distinct authorizations, but never twice with the same one.
pub fn job_id(intent_hash: &intent::Hash, authorization: Option<&eth::B256>) -> String {
    match authorization {
        Some(auth) => format!("{intent_hash}:{auth}"),
        None => format!("{intent_hash}:"),
    }
}

/// How a solve attempt concluded. All of these are business outcomes:
/// returning one does not consume a queue attempt.
#[derive(Debug)]
pub enum Outcome {
    /// The fill landed on-chain.
    Filled { block: Option<u64> },
    /// The solution went to the matchmaker; an authorization may come back.
    Posted(Uuid),
    /// A precondition ruled the intent out.
    Skipped(&'static str),
    /// The numbers don't work out.
    Unprofitable,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Chain(#[from] blockchain::Error),
    #[error(transparent)]
    Pricing(#[from] pricing::Error),
    #[error(transparent)]
    Quote(quote::Error),
    #[error(transparent)]
    Codec(#[from] codec::Error),
    #[error(transparent)]
    Relay(relay::Error),
    #[error(transparent)]
    Matchmaker(crate::infra::matchmaker::Error),
    #[error("approval transaction is not known to the node")]
    MissingApproval,
    #[error("authorization deadline precedes the target block")]
    AuthorizationExpired,
    #[error("amount conversion overflowed")]
    Math,
}

impl Error {
    fn format_variant(&self) -> &'static str {
        match self {
            Self::Chain(_) => "Chain",
            Self::Pricing(_) => "Pricing",
            Self::Quote(_) => "Quote",
            Self::Codec(_) => "Codec",
            Self::Relay(_) => "Relay",
            Self::Matchmaker(_) => "Matchmaker",
            Self::MissingApproval => "MissingApproval",
            Self::AuthorizationExpired => "AuthorizationExpired",
            Self::Math => "Math",
        }
    }
}

pub struct Config {
    pub chain: eth::ChainId,
    pub contracts: Contracts,
    pub rpc: Rpc,
    pub signer: PrivateKeySigner,
    pub erc20: Erc20,
    pub erc721: Erc721,
    pub public: relay::public::Public,
    pub private: Arc<relay::PrivateRelay>,
    pub matchmaker: Matchmaker,
    pub store: Store,
    pub inventory: crate::domain::inventory::Inventory,
    /// When set, fills whose carrier is already mined go through the public
    /// mempool instead of a bundle.
    pub relay_directly_when_possible: bool,
}

pub struct Solver {
    config: Config,
    /// Wired up after construction; solve queues need the solver as their
    /// handler and the solver re-enqueues follow-up jobs.
    queues: OnceLock<Queues>,
}

#[derive(Clone)]
pub struct Queues {
    pub erc20: queue::Queue<SolveJob>,
    pub erc721: queue::Queue<SolveJob>,
}

impl Queues {
    fn get(&self, protocol: Protocol) -> &queue::Queue<SolveJob> {
        match protocol {
            Protocol::Erc20 => &self.erc20,
            Protocol::Erc721 => &self.erc721,
        }
    }
}

impl Solver {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            config,
            queues: OnceLock::new(),
        })
    }

    /// Attaches the solve queues. Must happen before the first job runs.
    pub fn connect(&self, queues: Queues) {
        let _ = self.queues.set(queues);
    }

    pub fn address(&self) -> eth::Address {
        self.config.signer.address()
    }

    pub fn intent_hash(&self, intent: &Intent) -> intent::Hash {
        codec::intent_hash(intent, self.config.chain, &self.config.contracts)
    }

    pub fn authorization_hash(&self, authorization: &auth::Authorization, protocol: Protocol) -> eth::B256 {
        codec::authorization_hash(
            authorization,
            protocol,
            self.config.chain,
            &self.config.contracts,
        )
    }

    /// Entry point for the solve queues.
    pub async fn process(self: Arc<Self>, job: queue::Job<SolveJob>) -> anyhow::Result<()> {
        let protocol = job.payload.intent.protocol();
        metrics::solve(protocol.label());
        let hash = self.intent_hash(&job.payload.intent);
        let span = tracing::info_span!("solve", intent = %hash, attempt = job.attempt);

        async {
            if protocol == Protocol::Erc721 {
                self.config
                    .store
                    .set_status(hash.0, crate::infra::store::StatusState::Pending, "solving")
                    .await;
            }
            match self.attempt(&job, hash).await {
                Ok(Outcome::Filled { block }) => {
                    tracing::info!(?block, "intent filled");
                    metrics::fill(protocol.label());
                    if protocol == Protocol::Erc721 {
                        self.config
                            .store
                            .set_status(hash.0, crate::infra::store::StatusState::Success, "filled")
                            .await;
                    }
                    Ok(())
                }
                Ok(Outcome::Posted(uuid)) => {
                    tracing::info!(%uuid, "solution posted to matchmaker");
                    Ok(())
                }
                Ok(Outcome::Skipped(reason)) => {
                    tracing::info!(reason, "skipping intent");
                    metrics::skip(reason);
                    Ok(())
                }
                Ok(Outcome::Unprofitable) => {
                    tracing::error!("solution not good enough");
                    metrics::skip("unprofitable");
                    if protocol == Protocol::Erc721 {
                        self.config
                            .store
                            .set_status(
                                hash.0,
                                crate::infra::store::StatusState::Failure,
                                "not profitable",
                            )
                            .await;
                    }
                    Ok(())
                }
                Err(err) => {
                    metrics::solve_error(err.format_variant());
                    if protocol == Protocol::Erc721 {
                        self.config
                            .store
                            .set_status(
                                hash.0,
                                crate::infra::store::StatusState::Failure,
                                err.format_variant(),
                            )
                            .await;
                    }
                    Err(err.into())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn attempt(
        &self,
        job: &queue::Job<SolveJob>,
        hash: intent::Hash,
    ) -> Result<Outcome, Error> {
        let intent = &job.payload.intent;

        // Preconditions. Each miss is a hard stop, not a failure.
        let fill_amount = match self.preconditions(intent, hash).await? {
            Ok(fill_amount) => fill_amount,
            Err(reason) => return Ok(Outcome::Skipped(reason)),
        };

        // The price bound at the estimated inclusion timestamp.
        let latest = self.config.rpc.latest_block().await?;
        let decay_timestamp = latest.timestamp + PESSIMISTIC_BLOCK_TIME.as_secs();
        let bound = pricing::fill_bound(intent, decay_timestamp)?;

        // Quote, unless the job already carries a plan.
        let plan = match &job.payload.plan {
            Some(plan) => plan.clone(),
            None => match self.build_plan(intent, fill_amount).await {
                Ok(plan) => plan,
                Err(quote::Error::NotFound | quote::Error::OrderNotSupported) => {
                    return Ok(Outcome::Skipped("no route"));
                }
                Err(err) => return Err(Error::Quote(err)),
            },
        };
        let within_bound = match intent.is_buy {
            true => plan.execute_amount <= bound,
            false => plan.execute_amount >= bound,
        };
        if !within_bound {
            tracing::error!(bound, execute = plan.execute_amount, "quote outside the window");
            return Ok(Outcome::Unprofitable);
        }

        // Profit accounting.
        let base_fee = self.config.rpc.pending_base_fee().await?;
        let mut priority_fee = eth::GasPrice(eth::U256::from(economics::DEFAULT_PRIORITY_FEE));
        if intent.is_incentivized {
            priority_fee = priority_fee.max(eth::GasPrice(eth::U256::from(
                economics::MIN_INCENTIVIZED_PRIORITY_FEE,
            )));
        }
        let gas = economics::swap_gas(plan.gas);
        let gas_price = base_fee + priority_fee;

        let gross_atoms = eth::U256::from(match intent.is_buy {
            true => bound - plan.execute_amount,
            false => plan.execute_amount - bound,
        });
        let gross = conv::token_to_native(
            &gross_atoms,
            &plan.execute_token_price,
            plan.execute_token_decimals,
        )
        .ok_or(Error::Math)?;
        let solver_gas_fee = gas_price.fee(gas);

        let mut execute_amount = plan.execute_amount;
        let mut calls = plan.calls.clone();

        // The matchmaker gets its authorization gas reimbursed in the
        // execute token, straight out of the settlement callback.
        let matchmade = intent.is_matchmade(self.config.contracts.matchmaker);
        let mut matchmaker_fee = eth::Ether::default();
        if matchmade {
            matchmaker_fee = economics::matchmaker_reimbursement(gas_price);
            let reimbursement_atoms = conv::native_to_token(
                &matchmaker_fee.0,
                &plan.execute_token_price,
                plan.execute_token_decimals,
            )
            .ok_or(Error::Math)?;
            let execute_token = match intent.is_buy {
                true => intent.sell_token,
                false => intent.buy_token,
            };
            calls.push(if execute_token == eth::NATIVE_TOKEN {
                solution::Call {
                    to: self.config.contracts.matchmaker,
                    data: vec![],
                    value: reimbursement_atoms,
                }
            } else {
                solution::Call {
                    to: execute_token,
                    data: alloy::sol_types::SolCall::abi_encode(
                        &codec::sol::tokens::transferCall {
                            to: self.config.contracts.matchmaker,
                            amount: reimbursement_atoms,
                        },
                    ),
                    value: eth::U256::ZERO,
                }
            });
            let reimbursement_atoms: u128 =
                reimbursement_atoms.try_into().map_err(|_| Error::Math)?;
            execute_amount = match intent.is_buy {
                true => execute_amount.checked_sub(reimbursement_atoms),
                false => execute_amount.checked_add(reimbursement_atoms),
            }
            .ok_or(Error::Math)?;
        }

        // Incentivized intents pay the protocol-computed tip as transaction
        // value; everyone else competes through the tip auction below.
        let mut tip = eth::Ether::default();
        if intent.is_incentivized {
            let anchors = pricing::anchors(intent)?;
            tip = economics::incentivization_tip(
                intent.is_buy,
                anchors.expected_amount,
                intent.expected_amount_bps,
                execute_amount,
            );
        }

        let costs = solver_gas_fee + matchmaker_fee + tip;
        let net_profit = match gross.checked_sub(costs.0) {
            Some(net) if !net.is_zero() => eth::Ether(net),
            _ if self.config.chain.enforces_profit_floor() => {
                tracing::error!(
                    gross = %gross,
                    costs = %costs.0,
                    "fill is not profitable"
                );
                return Ok(Outcome::Unprofitable);
            }
            _ => eth::Ether::default(),
        };

        if !intent.is_incentivized && !net_profit.0.is_zero() {
            let auction = economics::tip_auction(net_profit, gas);
            priority_fee = priority_fee + auction.priority_fee_bump;
            let maker_atoms = conv::native_to_token(
                &auction.maker_share.0,
                &plan.execute_token_price,
                plan.execute_token_decimals,
            )
            .ok_or(Error::Math)?
            .try_into()
            .map_err(|_| Error::Math)?;
            execute_amount = match intent.is_buy {
                true => execute_amount.checked_sub(maker_atoms),
                false => execute_amount.checked_add(maker_atoms),
            }
            .ok_or(Error::Math)?;
        }

        // Resolve the approval carrier and check whether it already mined.
        let approval = match &job.payload.approval {
            None => None,
            Some(Approval::Raw(raw)) => {
                let hash = keccak256(raw);
                let mined = match self.config.rpc.transaction(hash).await? {
                    Some(tx) => tx.block_number.is_some(),
                    None => false,
                };
                Some((
                    SignedTx {
                        raw: raw.clone(),
                        hash,
                    },
                    mined,
                ))
            }
            Some(Approval::Hash(hash)) => Some(
                self.config
                    .rpc
                    .raw_transaction(*hash)
                    .await?
                    .ok_or(Error::MissingApproval)?,
            ),
        };
        let user_txs = match &approval {
            Some((tx, false)) => vec![tx.clone()],
            _ => vec![],
        };

        // Assemble and sign the transactions.
        let estimated_base_fee = economics::estimated_base_fee(base_fee);
        let max_fee: u128 = (estimated_base_fee + priority_fee)
            .0
            .try_into()
            .map_err(|_| Error::Math)?;
        let priority: u128 = priority_fee.0.try_into().map_err(|_| Error::Math)?;

        let mut nonce = self
            .config
            .rpc
            .pending_nonce(self.config.signer.address())
            .await?;
        let mut solver_txs = Vec::with_capacity(plan.pre_txs.len() + 1);
        for pre_tx in &plan.pre_txs {
            let request = TransactionRequest::default()
                .with_from(self.config.signer.address())
                .with_to(pre_tx.to)
                .with_input(pre_tx.data.clone())
                .with_value(pre_tx.value)
                .with_nonce(nonce)
                .with_chain_id(self.config.chain.value())
                .with_gas_limit(economics::DEFAULT_SWAP_GAS)
                .with_max_fee_per_gas(max_fee)
                .with_max_priority_fee_per_gas(priority);
            solver_txs.push(blockchain::sign_transaction(&self.config.signer, request).await?);
            nonce += 1;
        }

        let variant = match (matchmade, &job.payload.authorization) {
            (false, _) => FillVariant::Direct,
            (true, None) => FillVariant::OnChainAuthCheck,
            (true, Some(_)) => FillVariant::SignedAuth,
        };
        let calldata = codec::encode_fill(&codec::Fill {
            intent,
            fill_amount,
            execute_amount,
            calls: &calls,
            variant,
            authorization: job.payload.authorization.as_ref(),
        })?;
        let gas_limit: u64 = (gas.0 * eth::U256::from(5) / eth::U256::from(4))
            .try_into()
            .map_err(|_| Error::Math)?;
        let request = TransactionRequest::default()
            .with_from(self.config.signer.address())
            .with_to(self.config.contracts.settlement(intent.protocol()))
            .with_input(calldata)
            .with_value(tip.0)
            .with_nonce(nonce)
            .with_chain_id(self.config.chain.value())
            .with_gas_limit(gas_limit)
            .with_max_fee_per_gas(max_fee)
            .with_max_priority_fee_per_gas(priority);
        let settlement_tx =
            blockchain::sign_transaction(&self.config.signer, request.clone()).await?;
        solver_txs.push(settlement_tx.clone());

        let target_block = latest.number + 1;

        // Dispatch.
        match (matchmade, &job.payload.authorization) {
            (true, None) => {
                let uuid = Uuid::new_v4();
                self.config
                    .store
                    .cache_solution(
                        uuid,
                        CachedSolution {
                            intent: intent.clone(),
                            approval: job.payload.approval.clone(),
                            plan: plan.clone(),
                        },
                    )
                    .await;
                let txs: Vec<_> = user_txs.iter().chain(solver_txs.iter()).cloned().collect();
                self.config
                    .matchmaker
                    .submit(uuid, intent, &txs)
                    .await
                    .map_err(Error::Matchmaker)?;
                self.schedule_follow_up(hash, &job.payload);
                return Ok(Outcome::Posted(uuid));
            }
            (true, Some(auth)) => {
                if !auth.authorization.covers(target_block) {
                    // Re-enter without the stale authorization so the next
                    // attempt posts a fresh solution.
                    self.resubmit_without_authorization(hash, &job.payload);
                    return Err(Error::AuthorizationExpired);
                }
            }
            (false, _) => (),
        }

        let force_bundle = !plan.pre_txs.is_empty()
            || !user_txs.is_empty()
            || !self.config.relay_directly_when_possible;
        let receipt = if force_bundle {
            self.config
                .private
                .relay(
                    relay::Bundle {
                        user_txs,
                        solver_txs,
                    },
                    target_block,
                )
                .await
                .map_err(Error::Relay)?
        } else {
            self.config
                .public
                .relay(request, &settlement_tx, intent.is_incentivized)
                .await
                .map_err(Error::Relay)?
        };

        // Whatever we received accumulates as inventory to liquidate later.
        self.config
            .inventory
            .track(self.post_fill_token(intent))
            .await;

        Ok(Outcome::Filled {
            block: receipt.block_number,
        })
    }

    /// The shared precondition checks. Returns the fill amount on success or
    /// the skip reason.
    async fn preconditions(
        &self,
        intent: &Intent,
        hash: intent::Hash,
    ) -> Result<Result<u128, &'static str>, Error> {
        let output = self
            .config
            .rpc
            .call(
                TransactionRequest::default()
                    .with_to(self.config.contracts.settlement(intent.protocol()))
                    .with_input(codec::encode_intent_status(hash)),
            )
            .await?;
        let status = codec::decode_intent_status(&output)?;
        if status.is_cancelled {
            return Ok(Err("cancelled"));
        }
        if status.amount_filled >= intent.amount {
            return Ok(Err("filled"));
        }
        if status.amount_filled > 0 && !intent.is_partially_fillable {
            return Ok(Err("filled"));
        }

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        if u64::from(intent.start_time) > now {
            return Ok(Err("not started"));
        }
        if u64::from(intent.end_time) <= now {
            return Ok(Err("expired"));
        }

        if !intent.allows_solver(self.address(), self.config.contracts.matchmaker) {
            return Ok(Err("unsupported solver"));
        }
        if intent.sell_token == eth::NATIVE_TOKEN {
            return Ok(Err("native sell token"));
        }
        if self
            .config
            .contracts
            .is_wrap_or_unwrap(intent.sell_token, intent.buy_token)
        {
            return Ok(Err("wrap or unwrap pair"));
        }

        if let Err(reason) = match intent.protocol() {
            Protocol::Erc20 => self.config.erc20.check(intent),
            Protocol::Erc721 => self.config.erc721.check(intent),
        } {
            return Ok(Err(reason));
        }

        Ok(Ok(intent.remaining(status.amount_filled)))
    }

    async fn build_plan(
        &self,
        intent: &Intent,
        fill_amount: u128,
    ) -> Result<solution::Plan, quote::Error> {
        match intent.protocol() {
            Protocol::Erc20 => self.config.erc20.build_plan(intent, fill_amount).await,
            Protocol::Erc721 => self.config.erc721.build_plan(intent, fill_amount).await,
        }
    }

    fn post_fill_token(&self, intent: &Intent) -> eth::Address {
        match intent.protocol() {
            Protocol::Erc20 => self.config.erc20.post_fill_token(intent),
            Protocol::Erc721 => self.config.erc721.post_fill_token(intent),
        }
    }

    /// Schedules a fresh attempt after four block times to cover matchmaker
    /// silence. The claim on the job id is only released once the current
    /// job completes, so the re-submission happens from a detached task.
    fn schedule_follow_up(&self, hash: intent::Hash, job: &SolveJob) {
        let Some(queues) = self.queues.get() else {
            return;
        };
        let queue = queues.get(job.intent.protocol()).clone();
        let job = SolveJob {
            plan: None,
            authorization: None,
            ..job.clone()
        };
        let ttl = job
            .intent
            .remaining_validity(chrono::Utc::now().timestamp().max(0) as u32);
        tokio::spawn(async move {
            tokio::time::sleep(BLOCK_TIME * 4).await;
            queue.submit(job_id(&hash, None), ttl, job);
        });
    }

    fn resubmit_without_authorization(&self, hash: intent::Hash, job: &SolveJob) {
        let Some(queues) = self.queues.get() else {
            return;
        };
        let queue = queues.get(job.intent.protocol());
        let job = SolveJob {
            authorization: None,
            plan: None,
            ..job.clone()
        };
        let ttl = job
            .intent
            .remaining_validity(chrono::Utc::now().timestamp().max(0) as u32);
        queue.submit(job_id(&hash, None), ttl, job);
    }
}
