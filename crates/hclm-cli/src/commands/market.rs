//! Sale, rewards claim, and reward aggregation commands.

use anyhow::Result;

use super::{kv, kv_units, parse_amount, print_receipt, surfaced, Context};

pub async fn sale_status(ctx: &Context) -> Result<()> {
    let status = ctx
        .orchestrator
        .sale_status(&ctx.session)
        .await
        .map_err(surfaced)?;
    kv("active", status.active);
    kv_units("per_wallet_cap_eth", status.per_wallet_cap);
    kv_units("global_cap_eth", status.global_cap);
    kv_units("total_in_eth", status.total_contributed);
    if ctx.session.account.is_some() {
        kv_units("in_eth_by_user", status.contributed_by_user);
        match status.wallet_room() {
            Some(room) => kv_units("wallet_room_eth", room),
            None => kv("wallet_room_eth", "uncapped"),
        }
    }
    Ok(())
}

pub async fn buy(ctx: &Context, eth: &str) -> Result<()> {
    let amount = parse_amount("eth", eth)?;
    let receipt = ctx
        .orchestrator
        .buy(&ctx.session, amount)
        .await
        .map_err(surfaced)?;
    kv_units("paid_eth", amount);
    print_receipt(&receipt);
    Ok(())
}

pub async fn claim(ctx: &Context) -> Result<()> {
    let claimed = ctx
        .orchestrator
        .claim_rewards(&ctx.session)
        .await
        .map_err(surfaced)?;
    kv_units("claimed", claimed);
    Ok(())
}

pub async fn aggregate(ctx: &Context, dry_run: bool) -> Result<()> {
    let (plan, receipt) = if dry_run {
        let plan = ctx
            .orchestrator
            .plan_aggregation()
            .await
            .map_err(surfaced)?;
        (plan, None)
    } else {
        let report = ctx
            .orchestrator
            .aggregate_rewards(&ctx.session)
            .await
            .map_err(surfaced)?;
        (report.plan, Some(report.receipt))
    };

    kv("tip", plan.tip);
    match plan.checkpoint {
        Some(h) => kv("checkpoint", h),
        None => kv("checkpoint", "none"),
    }
    kv("scan_from", plan.scan_from);
    kv("contributions", plan.contributions);
    kv_units("sum", plan.sum);
    kv("dry_run", dry_run);
    if let Some(r) = receipt {
        print_receipt(&r);
    }
    Ok(())
}
