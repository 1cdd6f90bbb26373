mod common;

use common::Harness;
use joyvault_core::client::payment::PaymentError;
use joyvault_core::protocol::VaultTier;
use joyvault_core::protocol::token::{self, TokenAccount};
use joyvault_core::testing::{Fault, SignBehavior};

#[tokio::test]
async fn test_first_payment_creates_treasury_account() {
    let h = Harness::new();
    h.fund_tokens(30_000_000);
    let payments = h.client.payments();
    assert_eq!(payments.balance_of(&h.treasury).await.unwrap(), 0);

    let receipt = payments.pay_for_tier(VaultTier::Pro).await.unwrap();
    assert_eq!(receipt.amount, 20_000_000);
    assert!(receipt.created_destination);
    assert_eq!(
        receipt.destination,
        token::associated_token_address(&h.treasury, &h.client.config().payment_mint)
    );

    let data = h.ledger.account_data(&receipt.destination).unwrap();
    let treasury_account = TokenAccount::unpack(&data).unwrap();
    assert_eq!(treasury_account.owner, h.treasury);
    assert_eq!(treasury_account.amount, 20_000_000);
    assert_eq!(payments.balance_of(&h.wallet.pubkey()).await.unwrap(), 10_000_000);

    let again = payments.pay_for_tier(VaultTier::Starter).await.unwrap();
    assert!(!again.created_destination);
    assert_eq!(h.treasury_tokens(), 25_000_000);
}

#[tokio::test]
async fn test_tier_prices_come_from_config() {
    let h = Harness::new();
    let payments = h.client.payments();
    let prices = [
        (VaultTier::Free, 0),
        (VaultTier::Starter, 5_000_000),
        (VaultTier::Pro, 20_000_000),
        (VaultTier::Ultra, 50_000_000),
    ];
    for (tier, price) in prices {
        assert_eq!(payments.tier_price(tier).await.unwrap(), price);
    }
}

#[tokio::test]
async fn test_free_tier_has_nothing_to_pay() {
    let h = Harness::new();
    let err = h
        .client
        .payments()
        .pay_for_tier(VaultTier::Free)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NothingToPay { tier: VaultTier::Free }));
    assert!(h.wallet.prompts().is_empty());
}

#[tokio::test]
async fn test_short_balance_reports_both_amounts() {
    let h = Harness::new();
    h.fund_tokens(4_999_999);
    let err = h
        .client
        .payments()
        .pay_for_tier(VaultTier::Starter)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PaymentError::InsufficientBalance {
            current: 4_999_999,
            required: 5_000_000
        }
    ));
    assert_eq!(err.to_string(), "Insufficient balance: have 4.999999, need 5.00");
    assert!(h.wallet.prompts().is_empty());
}

#[tokio::test]
async fn test_no_token_account_means_zero_balance() {
    let h = Harness::new();
    let err = h
        .client
        .payments()
        .pay_for_tier(VaultTier::Ultra)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PaymentError::InsufficientBalance {
            current: 0,
            required: 50_000_000
        }
    ));
}

#[tokio::test]
async fn test_payment_is_not_resubmitted() {
    let h = Harness::new();
    h.fund_tokens(10_000_000);

    h.ledger.inject(Fault::TransportOnSend);
    let err = h
        .client
        .payments()
        .pay_for_tier(VaultTier::Starter)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Transport(_)));
    assert_eq!(h.wallet.prompts(), vec!["pay_for_tier"]);
    assert_eq!(h.treasury_tokens(), 0);
}

#[tokio::test]
async fn test_unconfirmed_payment_is_an_error() {
    let h = Harness::new();
    h.fund_tokens(10_000_000);

    h.ledger.inject(Fault::LoseConfirmation);
    let err = h
        .client
        .payments()
        .pay_for_tier(VaultTier::Starter)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Unconfirmed { .. }));
}

#[tokio::test]
async fn test_cancel_and_reject_are_distinct() {
    let h = Harness::new();
    h.fund_tokens(10_000_000);
    h.wallet
        .then(SignBehavior::Cancel)
        .then(SignBehavior::Reject("hardware wallet locked".into()));

    let payments = h.client.payments();
    assert!(matches!(
        payments.pay_for_tier(VaultTier::Starter).await,
        Err(PaymentError::UserCancelled)
    ));
    assert!(matches!(
        payments.pay_for_tier(VaultTier::Starter).await,
        Err(PaymentError::Signer(_))
    ));
    assert_eq!(h.treasury_tokens(), 0);
}
