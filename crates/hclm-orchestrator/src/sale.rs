//! Token sale purchase.

use tracing::{info, instrument, warn};

use hclm_schemas::{Address, Amount, Receipt, SaleStatus, WriteCall, WriteMethod};

use crate::{Orchestrator, Session, WorkflowError};

impl Orchestrator {
    /// Buy tokens for `eth_amount` wei. The amount travels as the call's
    /// attached value, not as an argument.
    ///
    /// The sale-state pre-checks are advisory: if they cannot be read the
    /// purchase proceeds and the sale contract decides.
    #[instrument(skip_all, fields(workflow = "buy", eth = %eth_amount))]
    pub async fn buy(&self, session: &Session, eth_amount: Amount) -> Result<Receipt, WorkflowError> {
        if eth_amount.is_zero() {
            return Err(WorkflowError::InvalidAmount);
        }
        let account = self.authorize_write(session).await?;
        let sale = self.config.contracts.sale;

        match self.ledger.sale_active(sale).await {
            Ok(true) => {}
            Ok(false) => return Err(WorkflowError::SalePaused),
            Err(e) => warn!(error = %e, "sale active check failed, proceeding"),
        }

        self.check_wallet_room(sale, account, eth_amount).await?;

        let call = WriteCall::new(sale, WriteMethod::Buy).with_value(eth_amount);
        let receipt = self.ledger.submit_and_confirm(account, &call).await?;
        info!(eth = %eth_amount, "purchase confirmed");

        self.refresh(session).await;
        Ok(receipt)
    }

    async fn check_wallet_room(
        &self,
        sale: Address,
        account: Address,
        eth_amount: Amount,
    ) -> Result<(), WorkflowError> {
        let (cap, spent) = tokio::join!(
            self.ledger.per_wallet_cap_eth(sale),
            self.ledger.in_eth_by_user(sale, account),
        );
        let (cap, spent) = match (cap, spent) {
            (Ok(c), Ok(s)) => (c, s),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "wallet cap check failed, proceeding");
                return Ok(());
            }
        };
        // zero cap = uncapped
        if cap.is_zero() {
            return Ok(());
        }
        let room = cap.saturating_sub(spent);
        if eth_amount > room {
            return Err(WorkflowError::SaleCapExceeded {
                requested: eth_amount,
                room,
            });
        }
        Ok(())
    }

    /// Sale state for display. The per-user figure is zero without an account.
    pub async fn sale_status(&self, session: &Session) -> Result<SaleStatus, WorkflowError> {
        let sale = self.config.contracts.sale;
        let user_share = async {
            match session.account {
                Some(a) => self.ledger.in_eth_by_user(sale, a).await,
                None => Ok(Amount::ZERO),
            }
        };
        let (active, per_wallet_cap, global_cap, total_contributed, contributed_by_user) = tokio::join!(
            self.ledger.sale_active(sale),
            self.ledger.per_wallet_cap_eth(sale),
            self.ledger.global_cap_eth(sale),
            self.ledger.total_in_eth(sale),
            user_share,
        );
        Ok(SaleStatus {
            active: active?,
            per_wallet_cap: per_wallet_cap?,
            global_cap: global_cap?,
            contributed_by_user: contributed_by_user?,
            total_contributed: total_contributed?,
        })
    }
}
