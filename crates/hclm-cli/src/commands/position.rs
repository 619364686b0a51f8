//! Position commands: status, collateral, borrowing, repayment, close.

use anyhow::Result;

use hclm_orchestrator::{borrow_capacity, WakeOutcome};

use super::{kv, kv_units, parse_amount, print_receipt, surfaced, Context};

pub async fn status(ctx: &Context) -> Result<()> {
    let snap = ctx.orchestrator.refresh(&ctx.session).await;
    kv("connected", snap.is_connected());
    let Some(account) = snap.account else {
        return Ok(());
    };

    let p = snap.position;
    kv("account", account);
    kv_units("token_balance", p.token_balance);
    kv_units("pending_reward", p.pending_reward);
    kv_units("debt_principal", p.debt_principal);
    kv_units("debt_interest", p.debt_interest);
    kv_units("collateral_eth", p.collateral_amount);
    kv("reward_index", p.reward_index);

    let cap = borrow_capacity(
        p.collateral_amount,
        p.debt_principal,
        &ctx.orchestrator.config().lending,
    );
    kv_units("max_borrow", cap.max_borrow_total);
    kv_units("headroom", cap.headroom);

    let stale: Vec<&str> = snap.stale_fields.iter().map(|f| f.as_str()).collect();
    kv(
        "stale",
        if stale.is_empty() {
            "none".to_string()
        } else {
            stale.join(",")
        },
    );
    if let Some(at) = snap.refreshed_at {
        kv("refreshed_at", at.to_rfc3339());
    }
    Ok(())
}

pub async fn deposit(ctx: &Context, eth: &str) -> Result<()> {
    let amount = parse_amount("eth", eth)?;
    let receipt = ctx
        .orchestrator
        .deposit_collateral(&ctx.session, amount)
        .await
        .map_err(surfaced)?;
    kv_units("deposited_eth", amount);
    print_receipt(&receipt);
    Ok(())
}

pub async fn borrow(ctx: &Context, amount: &str) -> Result<()> {
    let amount = parse_amount("amount", amount)?;
    let receipt = ctx
        .orchestrator
        .borrow(&ctx.session, amount)
        .await
        .map_err(surfaced)?;
    kv_units("borrowed", amount);
    print_receipt(&receipt);
    Ok(())
}

pub async fn repay(ctx: &Context, amount: &str) -> Result<()> {
    let amount = parse_amount("amount", amount)?;
    let receipt = ctx
        .orchestrator
        .repay_partial(&ctx.session, amount)
        .await
        .map_err(surfaced)?;
    kv_units("repaid", amount);
    print_receipt(&receipt);
    Ok(())
}

pub async fn repay_interest(ctx: &Context) -> Result<()> {
    let paid = ctx
        .orchestrator
        .repay_interest_only(&ctx.session)
        .await
        .map_err(surfaced)?;
    kv_units("repaid_interest", paid);
    Ok(())
}

pub async fn poke(ctx: &Context) -> Result<()> {
    let receipt = ctx
        .orchestrator
        .poke_accrue(&ctx.session)
        .await
        .map_err(surfaced)?;
    print_receipt(&receipt);
    Ok(())
}

pub async fn close(ctx: &Context) -> Result<()> {
    let report = ctx
        .orchestrator
        .close_position(&ctx.session)
        .await
        .map_err(surfaced)?;

    let wake = match &report.wake {
        WakeOutcome::Skipped => "skipped".to_string(),
        WakeOutcome::Confirmed => "confirmed".to_string(),
        WakeOutcome::Failed { reason } => format!("failed ({reason})"),
    };
    kv("wake", wake);
    kv_units("debt_read", report.debt_read.total());
    kv_units("repaid", report.repaid);
    kv_units("finishing_repaid", report.finishing_repaid);
    kv_units("residual_debt", report.residual_debt);
    kv_units("withdrawn_eth", report.withdrawn_collateral);
    Ok(())
}
