//! Interactive CLI for the PARYS SDK
//!
//! Run with: cargo run --example interactive
//!
//! Requires PRIVATE_KEY environment variable. PARYS_NETWORK selects the network.

use std::io::{self, Write};

use parys_sdk::amount::{from_wei, to_wei};
use parys_sdk::chain::RpcChain;
use parys_sdk::constants::NATIVE_DECIMALS;
use parys_sdk::executor::{ItemStatus, ProgressEvent};
use parys_sdk::{
    ExecuteOptions, GovernanceVoteParams, LocalSigner, LockTokenParams, NetworkConfig,
    ParysClient, StakeTokenParams, VoteValue,
};
use tokio::sync::mpsc;

type Client = ParysClient<LocalSigner, RpcChain>;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let private_key = std::env::var("PRIVATE_KEY").expect("PRIVATE_KEY must be set");

    let config = NetworkConfig::from_env()?;
    let signer = LocalSigner::from_private_key(&private_key, &config)?;
    let client = ParysClient::connect(signer, config)?;

    println!("\n========================================");
    println!("        PARYS SDK Interactive CLI");
    println!("========================================");
    println!("Connected wallet: {}", client.address());

    loop {
        println!("\n----------------------------------------");
        println!("Select an option:");
        println!("  1. Lock PARYS");
        println!("  2. Unlock PARYS");
        println!("  3. Withdraw unlocked PARYS");
        println!("  4. Vote for a validator group");
        println!("  5. Vote on a governance proposal");
        println!("  6. View info");
        println!("  q. Quit");
        println!("----------------------------------------");

        let choice = prompt("Enter choice: ")?;
        let result = match choice.as_str() {
            "1" => lock_flow(&client, LockTokenParams::lock).await,
            "2" => lock_flow(&client, LockTokenParams::unlock).await,
            "3" => lock_flow(&client, LockTokenParams::withdraw).await,
            "4" => stake_flow(&client).await,
            "5" => governance_flow(&client).await,
            "6" => view_info(&client).await,
            "q" | "Q" => {
                println!("\nGoodbye!");
                break;
            }
            _ => {
                println!("\nInvalid choice. Please try again.");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("\nFailed: {e:#}");
        }
    }

    Ok(())
}

fn prompt(label: &str) -> eyre::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Options that print each item's progress as it happens
fn progress_options() -> ExecuteOptions {
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.status {
                ItemStatus::Submitted { tx_hash } => {
                    println!("  [{}] {:?} submitted: {tx_hash}", event.index, event.tx_type)
                }
                ItemStatus::Confirmed { .. } => {
                    println!("  [{}] {:?} confirmed", event.index, event.tx_type)
                }
                ItemStatus::Failed { error } => {
                    println!("  [{}] {:?} failed: {error}", event.index, event.tx_type)
                }
                _ => {}
            }
        }
    });
    ExecuteOptions {
        progress: Some(tx),
        cancel: None,
    }
}

async fn lock_flow(
    client: &Client,
    make_params: fn(alloy::primitives::U256) -> LockTokenParams,
) -> eyre::Result<()> {
    let amount = to_wei(&prompt("Amount of PARYS: ")?, NATIVE_DECIMALS)?;
    let params = make_params(amount);

    let plan = client.plan_lock(&params).await?;
    let fees = client.estimate_plan_fees(&plan, None).await?;
    println!("\nPlan ({} transactions):", plan.len());
    for (item, fee) in plan.iter().zip(&fees) {
        println!(
            "  {:?} {} PARYS, fee {} PARYS",
            item.tx_type(),
            from_wei(item.amount(), NATIVE_DECIMALS),
            from_wei(fee.fee, NATIVE_DECIMALS)
        );
    }
    if prompt("Proceed? [y/N] ")? != "y" {
        return Ok(());
    }

    let placeholders = client
        .lock_token(&params.with_fee_estimates(fees), progress_options())
        .await?;
    println!("\nDone: {} transactions confirmed", placeholders.len());
    Ok(())
}

async fn stake_flow(client: &Client) -> eyre::Result<()> {
    let groups = client.validator_groups().await?;
    println!("\nEligible groups:");
    for (i, group) in groups.iter().take(10).enumerate() {
        println!("  {i}. {} ({} PARYS)", group.address, from_wei(group.votes, NATIVE_DECIMALS));
    }
    let index: usize = prompt("Group number: ")?.parse()?;
    let group = groups
        .get(index)
        .ok_or_else(|| eyre::eyre!("No group {index}"))?;
    let amount = to_wei(&prompt("Amount of PARYS: ")?, NATIVE_DECIMALS)?;

    let params = StakeTokenParams::vote(amount, group.address);
    let plan = client.plan_stake(&params).await?;
    let fees = client.estimate_plan_fees(&plan, None).await?;
    let placeholders = client
        .stake_token(&params.with_fee_estimates(fees), progress_options())
        .await?;
    println!("\nDone: {} transactions confirmed", placeholders.len());
    Ok(())
}

async fn governance_flow(client: &Client) -> eyre::Result<()> {
    let proposal_id: u64 = prompt("Proposal id: ")?.parse()?;
    let value = match prompt("Vote [yes/no/abstain]: ")?.as_str() {
        "yes" => VoteValue::Yes,
        "no" => VoteValue::No,
        "abstain" => VoteValue::Abstain,
        other => eyre::bail!("Unknown vote {other}"),
    };

    let params = GovernanceVoteParams::new(proposal_id, value);
    let plan = parys_sdk::plan::governance_vote_plan(&params);
    let mut fees = client.estimate_plan_fees(&plan, None).await?;
    let fee = fees.pop().ok_or_else(|| eyre::eyre!("No fee estimate"))?;
    client
        .governance_vote(&params.with_fee_estimate(fee), progress_options())
        .await?;
    println!("\nVote cast");
    Ok(())
}

async fn view_info(client: &Client) -> eyre::Result<()> {
    let (balances, status, rates) = tokio::try_join!(
        client.balances(true),
        client.account_status(true),
        client.refresh_exchange_rates(false),
    )?;

    println!("\n=== ACCOUNT ===");
    println!("Registered: {}", status.is_registered);
    if let Some(account) = status.vote_signer_for {
        println!("Vote signer for: {account}");
    }
    for (token, value) in balances.tokens() {
        let symbol = client
            .tokens()
            .get(token)
            .map(|t| t.symbol.as_str())
            .unwrap_or("?");
        println!("{symbol}: {}", from_wei(value, NATIVE_DECIMALS));
    }
    println!("Locked: {}", from_wei(balances.locked.locked, NATIVE_DECIMALS));
    println!(
        "Pending: {} free, {} blocked",
        from_wei(balances.locked.pending_free, NATIVE_DECIMALS),
        from_wei(balances.locked.pending_blocked, NATIVE_DECIMALS)
    );

    println!("\n=== EXCHANGE RATES ===");
    for (token, rate) in &rates {
        println!("{token}: {rate:?}");
    }
    Ok(())
}
