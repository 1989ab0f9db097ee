//! Fee token preference order

use crate::tokens::TokenRegistry;
use crate::types::Balances;
use alloy::primitives::Address;

/// Order in which native-family tokens should be tried to pay a fee.
///
/// The preferred token comes first, then the token being transacted, then the
/// default display order. The result is then stably sorted by balance,
/// largest first, so funded tokens win ties broken by preference.
pub fn resolve_fee_token_order(
    tokens: &TokenRegistry,
    balances: &Balances,
    preferred: Option<Address>,
    tx_token: Option<Address>,
) -> Vec<Address> {
    let mut order: Vec<Address> = Vec::new();
    for candidate in preferred
        .into_iter()
        .chain(tx_token)
        .chain(tokens.native_tokens().map(|t| t.address))
    {
        if tokens.is_native_token(candidate) && !order.contains(&candidate) {
            order.push(candidate);
        }
    }
    order.sort_by_key(|addr| std::cmp::Reverse(balances.token_balance(*addr)));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use alloy::primitives::U256;

    struct Fixture {
        tokens: TokenRegistry,
        parys: Address,
        pusd: Address,
        peur: Address,
        peua: Address,
    }

    fn fixture() -> Fixture {
        let config = NetworkConfig::alfajores();
        let c = &config.contracts;
        Fixture {
            tokens: TokenRegistry::new(&config),
            parys: c.gold_token,
            pusd: c.stable_token,
            peur: c.stable_token_eur,
            peua: c.stable_token_brl,
        }
    }

    fn balances(values: &[(Address, u64)]) -> Balances {
        let mut balances = Balances::default();
        for (addr, value) in values {
            balances.set_token_balance(*addr, U256::from(*value));
        }
        balances
    }

    #[test]
    fn test_order_without_balances() {
        let f = fixture();
        let empty = Balances::default();
        let order = resolve_fee_token_order(&f.tokens, &empty, None, None);
        assert_eq!(order, [f.parys, f.pusd, f.peur, f.peua]);
        let order = resolve_fee_token_order(&f.tokens, &empty, Some(f.peur), Some(f.pusd));
        assert_eq!(order, [f.peur, f.pusd, f.parys, f.peua]);
        let order = resolve_fee_token_order(&f.tokens, &empty, Some(f.pusd), Some(f.pusd));
        assert_eq!(order, [f.pusd, f.parys, f.peur, f.peua]);
        let order = resolve_fee_token_order(&f.tokens, &empty, Some(f.pusd), Some(f.peua));
        assert_eq!(order, [f.pusd, f.peua, f.parys, f.peur]);
    }

    #[test]
    fn test_order_with_balances() {
        let f = fixture();
        let b = balances(&[(f.peur, 100)]);
        let order = resolve_fee_token_order(&f.tokens, &b, Some(f.pusd), Some(f.peur));
        assert_eq!(order, [f.peur, f.pusd, f.parys, f.peua]);

        let b = balances(&[(f.pusd, 200), (f.parys, 100)]);
        let order = resolve_fee_token_order(&f.tokens, &b, Some(f.peur), None);
        assert_eq!(order, [f.pusd, f.parys, f.peur, f.peua]);

        let b = balances(&[(f.pusd, 100), (f.peur, 100), (f.parys, 100)]);
        let order = resolve_fee_token_order(&f.tokens, &b, Some(f.parys), Some(f.pusd));
        assert_eq!(order, [f.parys, f.pusd, f.peur, f.peua]);
    }
}
