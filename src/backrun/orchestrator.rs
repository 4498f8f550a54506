//! Backrun Orchestrator
//!
//! Entry points of the router:
//!     - `backrun`: one trigger, guarded, one unit of work. Hard faults
//!       propagate and undo the whole call.
//!     - `backrun_batch`: a pass-through call followed by N triggers. Each
//!       trigger runs through `isolated_backrun`, so one failing trigger is
//!       reported as none while its siblings keep their results.
//!
//! Both entry points share the graceful guard. Reentry from a venue, receive
//! hook or pass-through gets none-outcomes back and changes nothing.
//!
//! Skips (zero input, no opportunity, unprofitable route, isolated fault) are
//! journaled as `BackrunExecuted` records with a reason, callers only ever see
//! `ExecutionOutcome::none()`.

use alloy::primitives::{Address, U256};
use tracing::{debug, info, warn};

use super::{BackrunRouter, PassThrough, Route, RouteExecutor};
use crate::error::{EngineError, ExecutionError, LedgerError};
use crate::events::{BackrunRecord, BackrunStatus, EngineEvent, SkipReason, SplitRecord};
use crate::types::{BackrunTrigger, ConfigId, ExecutionOutcome};

impl BackrunRouter {
    /// Attempt a backrun for a single trigger.
    ///
    /// Returns none when the guard is held, the input is zero, the oracle has
    /// nothing, or the route came back unprofitable. Any other failure is
    /// returned as Err with every state change undone.
    pub fn backrun(&self, trigger: &BackrunTrigger) -> Result<ExecutionOutcome, EngineError> {
        let guarded = self
            .guard
            .run(|| self.atomically(|| self.run_backrun(trigger)));

        match guarded {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(err)) => {
                warn!(
                    "❌ BACKRUN FAILED | venue {:?} | input {} | {}",
                    trigger.source_venue, trigger.input_amount, err
                );
                Err(err)
            }
            None => {
                debug!("Backrun for {:?} ignored: router already entered", trigger.source_venue);
                Ok(ExecutionOutcome::none())
            }
        }
    }

    /// Run a pass-through call, then attempt each trigger in order.
    ///
    /// The pass-through failing fails the whole batch. After that, one outcome
    /// per trigger, in trigger order; a trigger that faults yields none.
    pub fn backrun_batch(
        &self,
        pass_through: PassThrough,
        triggers: &[BackrunTrigger],
    ) -> Result<Vec<ExecutionOutcome>, EngineError> {
        let guarded = self.guard.run(|| -> Result<Vec<ExecutionOutcome>, EngineError> {
            let target = pass_through.target();
            self.atomically(|| pass_through.invoke(self))?;
            debug!("Pass-through to {:?} complete", target);

            let mut outcomes = Vec::with_capacity(triggers.len());
            for (index, trigger) in triggers.iter().enumerate() {
                let outcome = match self.isolated_backrun(trigger) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        warn!("⚠️ BATCH trigger {} isolated: {}", index, err);
                        self.record_skip(trigger, SkipReason::Fault(err.to_string()));
                        ExecutionOutcome::none()
                    }
                };
                outcomes.push(outcome);
            }

            let settled = outcomes.iter().filter(|o| !o.is_none()).count();
            info!("📦 BATCH complete | {} triggers | {} settled", triggers.len(), settled);
            Ok(outcomes)
        });

        match guarded {
            Some(result) => result,
            None => {
                debug!("Batch of {} ignored: router already entered", triggers.len());
                Ok(vec![ExecutionOutcome::none(); triggers.len()])
            }
        }
    }

    /// Fault boundary around one trigger, reachable only from `backrun_batch`.
    /// Runs only while the batch holds the guard; if the backrun fails,
    /// everything it did is undone and the error returned.
    fn isolated_backrun(&self, trigger: &BackrunTrigger) -> Result<ExecutionOutcome, EngineError> {
        if !self.guard.is_entered() {
            return Err(EngineError::UnauthorizedSelfCall);
        }
        self.atomically(|| self.run_backrun(trigger))
    }

    fn run_backrun(&self, trigger: &BackrunTrigger) -> Result<ExecutionOutcome, EngineError> {
        if !trigger.input_in_range() {
            return Err(EngineError::InputAmountOutOfRange {
                amount: trigger.input_amount,
            });
        }
        if trigger.input_amount.is_zero() {
            self.record_skip(trigger, SkipReason::ZeroInput);
            return Ok(ExecutionOutcome::none());
        }

        let source = self
            .venue(trigger.source_venue)
            .ok_or(EngineError::UnknownSourceVenue(trigger.source_venue))?;
        let (primary, secondary) = source.assets();
        let input_asset = if trigger.input_is_primary_asset { primary } else { secondary };

        let oracle = self.oracle.borrow().clone();
        let quote = oracle.get_quote(
            trigger.source_venue,
            trigger.input_is_primary_asset,
            trigger.input_amount,
        )?;
        if !quote.is_profitable() {
            debug!(
                "No opportunity for {:?} (estimate {})",
                trigger.source_venue, quote.estimated_profit
            );
            self.record_skip(trigger, SkipReason::NoOpportunity);
            return Ok(ExecutionOutcome::none());
        }

        let executed = self.atomically(|| {
            let route = Route::from_quote(&quote)?;
            RouteExecutor::new(self).execute(&route, trigger.input_amount, input_asset)
        });
        let execution = match executed {
            Ok(execution) => execution,
            Err(ExecutionError::Unprofitable { input, output }) => {
                debug!(
                    "Route for {:?} unprofitable: {} in, {} out",
                    trigger.source_venue, input, output
                );
                self.record_skip(trigger, SkipReason::Unprofitable);
                return Ok(ExecutionOutcome::none());
            }
            Err(err) => return Err(err.into()),
        };

        let split = self.distribute(trigger.config_id, input_asset, execution.profit, trigger.beneficiary)?;
        self.record_backrun(
            trigger,
            BackrunStatus::Settled,
            None,
            execution.profit,
            Some(input_asset),
            split.config_id,
        );

        info!(
            "✅ BACKRUN SETTLED | venue {:?} | input {} | profit {} {:?} | config {}",
            trigger.source_venue, trigger.input_amount, execution.profit, input_asset, split.config_id
        );
        Ok(ExecutionOutcome::settled(execution.profit, input_asset))
    }

    /// Pay out `total` of `asset` per the resolved revenue config: recipients
    /// in order, then dust. With a zero dust recipient the dust stays put.
    fn distribute(
        &self,
        config_id: ConfigId,
        asset: Address,
        total: U256,
        dust_recipient: Address,
    ) -> Result<SplitRecord, LedgerError> {
        let plan = self.distributor.borrow().plan_split(config_id, total, dust_recipient);
        let engine = self.address();

        for (recipient, amount) in plan.recipients.iter().zip(&plan.amounts) {
            self.move_funds(asset, engine, *recipient, *amount)?;
        }

        let stranded = plan.stranded_amount();
        if stranded.is_zero() {
            self.move_funds(asset, engine, plan.dust_recipient, plan.dust_amount)?;
        } else {
            warn!(
                "⚠️ REVENUE dust of {} {:?} has no recipient, left with the router",
                stranded, asset
            );
        }

        let record = SplitRecord {
            config_id: plan.config_id,
            asset,
            total: plan.total,
            recipients: plan.recipients,
            amounts: plan.amounts,
            dust_recipient: plan.dust_recipient,
            dust_amount: plan.dust_amount,
        };
        self.emit(EngineEvent::RevenueSplit(record.clone()));
        Ok(record)
    }

    fn record_skip(&self, trigger: &BackrunTrigger, reason: SkipReason) {
        info!(
            "BACKRUN SKIPPED | venue {:?} | input {} | {}",
            trigger.source_venue, trigger.input_amount, reason
        );
        self.record_backrun(
            trigger,
            BackrunStatus::Skipped,
            Some(reason),
            U256::ZERO,
            None,
            trigger.config_id,
        );
    }

    fn record_backrun(
        &self,
        trigger: &BackrunTrigger,
        status: BackrunStatus,
        skip_reason: Option<SkipReason>,
        realized_profit: U256,
        profit_asset: Option<Address>,
        config_id: ConfigId,
    ) {
        self.emit(EngineEvent::BackrunExecuted(BackrunRecord {
            trigger_id: trigger.id(),
            source_venue: trigger.source_venue,
            input_amount: trigger.input_amount,
            input_is_primary_asset: trigger.input_is_primary_asset,
            status,
            skip_reason,
            realized_profit,
            profit_asset,
            beneficiary: trigger.beneficiary,
            config_id,
        }));
    }
}
