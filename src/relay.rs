use crate::{
    errors::CoinOpError,
    traits::SponsorRelay,
    types::{
        ErrorResponse, EstimateResult, Request, Response, SponsorResult, UserOperation,
        UserOperationHash, UserOperationReceipt,
    },
};
use async_trait::async_trait;
use ethers::types::Address;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::debug;

/// JSON-RPC client for a paymaster and a bundler speaking the ERC-4337 v0.6 methods
#[derive(Clone, Debug)]
pub struct PaymasterRelay {
    /// The paymaster RPC url
    pub paymaster_url: String,
    /// The bundler RPC url
    pub bundler_url: String,
    /// The address of the entry point contract
    pub entry_point_address: Address,
    /// The client to use for HTTP requests
    client: Client,
}

impl PaymasterRelay {
    pub fn new(paymaster_url: String, bundler_url: String, entry_point_address: Address) -> Self {
        Self {
            paymaster_url,
            bundler_url,
            entry_point_address,
            client: Client::new(),
        }
    }

    async fn request<P: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: P,
    ) -> Result<R, CoinOpError> {
        let req_body = Request::new(method, params);
        let response = self.client.post(url).json(&req_body).send().await?;
        let str_response = response.text().await?;
        debug!(method, response = %str_response, "relay response");
        parse_rpc_response(&str_response)
    }
}

/// Decodes a JSON-RPC body. Error objects become [CoinOpError::SubmissionRejected]
/// carrying the relay's message unchanged.
pub fn parse_rpc_response<R: DeserializeOwned>(body: &str) -> Result<R, CoinOpError> {
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
        return Err(CoinOpError::SubmissionRejected {
            code: err.error.code,
            message: err.error.message,
        });
    }
    serde_json::from_str::<Response<R>>(body)
        .map(|res| res.result)
        .map_err(|e| CoinOpError::Network(format!("unexpected relay response ({e}): {body}")))
}

#[async_trait]
impl SponsorRelay for PaymasterRelay {
    async fn estimate_user_operation_gas(
        &self,
        user_operation: &UserOperation,
    ) -> Result<EstimateResult, CoinOpError> {
        let params = vec![json!(user_operation), json!(self.entry_point_address)];
        self.request(&self.bundler_url, "eth_estimateUserOperationGas", params)
            .await
    }

    async fn sponsor_user_operation(
        &self,
        user_operation: &UserOperation,
    ) -> Result<SponsorResult, CoinOpError> {
        let params = vec![json!(user_operation), json!(self.entry_point_address)];
        self.request(&self.paymaster_url, "pm_sponsorUserOperation", params)
            .await
    }

    async fn send_user_operation(
        &self,
        user_operation: &UserOperation,
    ) -> Result<UserOperationHash, CoinOpError> {
        let params = vec![json!(user_operation), json!(self.entry_point_address)];
        self.request(&self.bundler_url, "eth_sendUserOperation", params)
            .await
    }

    async fn user_operation_receipt(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, CoinOpError> {
        let params = vec![json!(hash)];
        self.request(&self.bundler_url, "eth_getUserOperationReceipt", params)
            .await
            .map_err(|e| match e {
                CoinOpError::SubmissionRejected { code, message } => {
                    CoinOpError::Network(format!("receipt lookup failed ({code}): {message}"))
                }
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::H256;

    #[test]
    fn test_error_payload_is_rejection_with_verbatim_message() {
        let body = r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Pre-verification gas 44582 is lower than calculated pre-verification gas 44656"},"id":1}"#;
        let err = parse_rpc_response::<UserOperationHash>(body).unwrap_err();
        assert_eq!(
            err,
            CoinOpError::SubmissionRejected {
                code: -32602,
                message: "Pre-verification gas 44582 is lower than calculated pre-verification gas 44656"
                    .to_string(),
            }
        );
    }

    #[test]
    fn test_result_payload_decodes() {
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":"{:?}"}}"#,
            H256::repeat_byte(0x42)
        );
        let hash = parse_rpc_response::<UserOperationHash>(&body).unwrap();
        assert_eq!(hash, H256::repeat_byte(0x42));
    }

    #[test]
    fn test_null_receipt_is_none() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        let receipt = parse_rpc_response::<Option<UserOperationReceipt>>(body).unwrap();
        assert!(receipt.is_none());
    }

    #[test]
    fn test_sponsor_result_without_gas_fields() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{"paymasterAndData":"0x1234"}}"#;
        let sponsor = parse_rpc_response::<SponsorResult>(body).unwrap();
        assert_eq!(sponsor.paymaster_and_data.to_vec(), vec![0x12, 0x34]);
        assert!(sponsor.call_gas_limit.is_none());
    }

    #[test]
    fn test_garbage_is_network_error() {
        let err = parse_rpc_response::<UserOperationHash>("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, CoinOpError::Network(_)));
    }
}
