//! VNPay redirect and callback protocol

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount::AmountCodec;
use super::signer::{CanonicalSigner, SECURE_HASH, SECURE_HASH_TYPE};
use crate::application::ports::{GatewayCallback, PaymentGateway};
use crate::domain::{DomainError, DomainResult};

const DATE_FORMAT: &str = "%Y%m%d%H%M%S";
const SUCCESS_CODE: &str = "00";
const HASH_ALGORITHM: &str = "HmacSHA512";

/// Longest accepted `expire_minutes`
pub const MAX_EXPIRE_MINUTES: i64 = 24 * 60;

/// VNPay merchant settings (`[gateway]` in the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VnPayConfig {
    pub tmn_code: String,
    pub hash_secret: String,
    pub pay_url: String,
    pub return_url: String,
    pub version: String,
    pub command: String,
    pub currency_code: String,
    pub locale: String,
    pub order_type: String,
    /// Offset of the gateway's wall clock from UTC
    pub timezone_offset_hours: i32,
    pub expire_minutes: i64,
    /// Where the payer's browser is sent after the callback is applied
    pub frontend_callback_url: Option<String>,
}

impl Default for VnPayConfig {
    fn default() -> Self {
        Self {
            tmn_code: String::new(),
            hash_secret: String::new(),
            pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string(),
            return_url: String::new(),
            version: "2.1.0".to_string(),
            command: "pay".to_string(),
            currency_code: "VND".to_string(),
            locale: "vn".to_string(),
            order_type: "other".to_string(),
            timezone_offset_hours: 7,
            expire_minutes: 15,
            frontend_callback_url: None,
        }
    }
}

impl VnPayConfig {
    /// Names of required settings that are blank.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        [
            ("tmn_code", &self.tmn_code),
            ("hash_secret", &self.hash_secret),
            ("pay_url", &self.pay_url),
            ("return_url", &self.return_url),
            ("version", &self.version),
            ("command", &self.command),
            ("currency_code", &self.currency_code),
            ("locale", &self.locale),
            ("order_type", &self.order_type),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Payment window between create and expire dates.
    pub fn expiry(&self) -> DomainResult<Duration> {
        if !(1..=MAX_EXPIRE_MINUTES).contains(&self.expire_minutes) {
            return Err(DomainError::Configuration(format!(
                "VNPay expire_minutes must be between 1 and {}, got {}",
                MAX_EXPIRE_MINUTES, self.expire_minutes
            )));
        }
        Ok(Duration::minutes(self.expire_minutes))
    }

    fn offset(&self) -> DomainResult<FixedOffset> {
        FixedOffset::east_opt(self.timezone_offset_hours * 3600).ok_or_else(|| {
            DomainError::Configuration(format!(
                "Invalid VNPay timezone offset: {} hours",
                self.timezone_offset_hours
            ))
        })
    }
}

pub struct VnPayGateway {
    config: VnPayConfig,
    signer: CanonicalSigner,
}

impl VnPayGateway {
    pub fn new(config: VnPayConfig) -> Self {
        let signer = CanonicalSigner::new(config.hash_secret.clone());
        Self { config, signer }
    }

    /// [`PaymentGateway::build_redirect_url`] with an explicit clock.
    pub fn build_redirect_url_at(
        &self,
        amount: Decimal,
        order_info: &str,
        txn_ref: &str,
        client_ip: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<String> {
        let missing = self.config.missing_settings();
        if !missing.is_empty() {
            return Err(DomainError::Configuration(format!(
                "VNPay configuration is incomplete. Please review settings for: {}",
                missing.join(", ")
            )));
        }

        let local = now.with_timezone(&self.config.offset()?);
        let expires = local + self.config.expiry()?;

        let cfg = &self.config;
        let mut params: BTreeMap<String, String> = [
            ("vnp_Version", cfg.version.clone()),
            ("vnp_Command", cfg.command.clone()),
            ("vnp_TmnCode", cfg.tmn_code.clone()),
            ("vnp_Amount", AmountCodec::encode(amount)?),
            ("vnp_CurrCode", cfg.currency_code.clone()),
            ("vnp_TxnRef", txn_ref.to_string()),
            ("vnp_OrderInfo", order_info.to_string()),
            ("vnp_OrderType", cfg.order_type.clone()),
            ("vnp_Locale", cfg.locale.clone()),
            ("vnp_ReturnUrl", cfg.return_url.clone()),
            ("vnp_IpAddr", client_ip.to_string()),
            ("vnp_CreateDate", local.format(DATE_FORMAT).to_string()),
            ("vnp_ExpireDate", expires.format(DATE_FORMAT).to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let signature = self.signer.sign(&CanonicalSigner::signing_string(&params))?;
        params.insert(SECURE_HASH_TYPE.to_string(), HASH_ALGORITHM.to_string());

        Ok(format!(
            "{}?{}&{}={}",
            cfg.pay_url,
            CanonicalSigner::canonical_query(&params),
            SECURE_HASH,
            signature
        ))
    }

    fn parse_pay_date(&self, raw: &str) -> Option<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(raw.trim(), DATE_FORMAT).ok()?;
        let offset = self.config.offset().ok()?;
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl PaymentGateway for VnPayGateway {
    fn build_redirect_url(
        &self,
        amount: Decimal,
        order_info: &str,
        txn_ref: &str,
        client_ip: &str,
    ) -> DomainResult<String> {
        self.build_redirect_url_at(amount, order_info, txn_ref, client_ip, Utc::now())
    }

    fn verify_callback(&self, params: &BTreeMap<String, String>) -> bool {
        self.signer.verify(params)
    }

    fn parse_callback(&self, params: &BTreeMap<String, String>) -> DomainResult<GatewayCallback> {
        let get = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let txn_ref = get("vnp_TxnRef").ok_or_else(|| {
            DomainError::Validation("Missing VNPay transaction reference".to_string())
        })?;
        let amount = get("vnp_Amount")
            .map(|raw| AmountCodec::decode(&raw))
            .transpose()?;
        let response_code = get("vnp_ResponseCode");
        let transaction_status = get("vnp_TransactionStatus");
        let success = response_code.as_deref() == Some(SUCCESS_CODE)
            && transaction_status.as_deref() == Some(SUCCESS_CODE);

        Ok(GatewayCallback {
            txn_ref,
            amount,
            response_code,
            transaction_status,
            order_info: get("vnp_OrderInfo"),
            paid_at: get("vnp_PayDate").and_then(|raw| self.parse_pay_date(&raw)),
            success,
        })
    }
}
