use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};

use super::{
    NAME, NeteaseMusic,
    models::{CodeCookie, LoginStatusResponse, QrImageResponse, QrKeyResponse, VipInfoResponse, VipTier},
};
use crate::{
    error::{ApiError, ApiResult},
    management::SessionConfig,
    providers::{host_result, notify},
    types::UserInfo,
    utils,
};

const USAGE: &str = "usage: [qr|sms|cookie] {phone|cookie} {captcha}";
const SMS_USAGE: &str = "usage: sms [phone] {captcha}";
const COOKIE_USAGE: &str = "usage: cookie {cookie}";

/// QR check codes reported by `/login/qr/check`.
const QR_EXPIRED: i64 = 800;
const QR_CONFIRMED: i64 = 803;

enum QrOutcome {
    Confirmed(String),
    Expired,
    TimedOut,
}

/// Decodes the base64 payload of a `data:image/png;base64,...` URL.
fn decode_data_url(data_url: &str) -> ApiResult<Vec<u8>> {
    let payload = data_url.split_once(',').map_or(data_url, |(_, data)| data);
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::Malformed(format!("qr image: {}", e)))
}

fn active_tier(tier: &Option<VipTier>, now_ms: i64) -> Option<&VipTier> {
    tier.as_ref().filter(|t| t.expire_time > now_ms)
}

/// Human readable subscription line, e.g. `annual SVIP level 7 expires 2030-01-01 00:00:00`.
pub(crate) fn vip_status(vip: &VipInfoResponse, now_ms: i64) -> String {
    let info = vip.data.as_ref().filter(|_| vip.code == 200);

    let tier = info.and_then(|info| {
        if let Some(t) = active_tier(&info.redplus, now_ms) {
            Some(format!(
                "SVIP level {} expires {}",
                info.red_vip_level,
                utils::format_timestamp_ms(t.expire_time)
            ))
        } else if let Some(t) = active_tier(&info.associator, now_ms) {
            Some(format!(
                "VIP level {} expires {}",
                t.vip_level,
                utils::format_timestamp_ms(t.expire_time)
            ))
        } else {
            active_tier(&info.music_package, now_ms).map(|t| {
                format!(
                    "music package level {} expires {}",
                    t.vip_level,
                    utils::format_timestamp_ms(t.expire_time)
                )
            })
        }
    });

    let annual = info.is_some_and(|info| info.red_vip_annual_count == 1);
    format!(
        "{}{}",
        if annual { "annual " } else { "non-annual " },
        tier.unwrap_or_else(|| "no VIP".to_string())
    )
}

impl NeteaseMusic {
    pub(super) async fn dispatch_login(&self, args: &[String]) -> ApiResult<String> {
        match args.first().map(String::as_str) {
            Some("qr") => self.login_qr().await,
            Some("sms") => self.login_sms(&args[1..]).await,
            Some("cookie") => self.login_cookie(&args[1..]).await,
            _ => Ok(USAGE.to_string()),
        }
    }

    async fn login_qr(&self) -> ApiResult<String> {
        let key: QrKeyResponse = self.client().get_json("/login/qr/key", &[]).await?;
        let key = key.data.unikey;
        let image: QrImageResponse = self
            .client()
            .get_json("/login/qr/create", &[("key", key.as_str()), ("qrimg", "true")])
            .await?;
        let qrimg = image.data.qrimg;

        let messenger = self.messenger.as_ref();
        notify(messenger, NAME, "generating QR code").await;
        notify(messenger, NAME, &qrimg).await;
        log::debug!("[{}] QR image: {}", NAME, qrimg);
        host_result(NAME, messenger.upload_avatar(decode_data_url(&qrimg)?).await);
        host_result(
            NAME,
            messenger
                .set_description("scan the QR code with the Netease app to log in")
                .await,
        );

        let config = self.session.snapshot().await;
        let interval = Duration::from_secs(config.qr_poll_interval_secs);
        let mut outcome = QrOutcome::TimedOut;
        for _ in 0..config.qr_poll_max_attempts.max(1) {
            let check: CodeCookie = self
                .client()
                .get_json("/login/qr/check", &[("key", key.as_str())])
                .await?;
            match check.code {
                QR_CONFIRMED => {
                    outcome = QrOutcome::Confirmed(check.cookie.unwrap_or_default());
                    break;
                }
                QR_EXPIRED => {
                    outcome = QrOutcome::Expired;
                    break;
                }
                _ => tokio::time::sleep(interval).await,
            }
        }
        host_result(NAME, messenger.delete_avatar().await);

        match outcome {
            QrOutcome::Confirmed(cookie) => {
                self.session
                    .update(|c| {
                        c.set_cookie(utils::process_cookie(&cookie));
                        c.refresh_cookie = true;
                    })
                    .await?;
                host_result(NAME, messenger.set_description("Netease logged in").await);
                Ok("QR login success".to_string())
            }
            QrOutcome::Expired => Ok("QR code expired".to_string()),
            QrOutcome::TimedOut => Ok("QR login failed or timed out".to_string()),
        }
    }

    async fn login_sms(&self, args: &[String]) -> ApiResult<String> {
        match args {
            [phone] => {
                let status: CodeCookie = self
                    .client()
                    .get_json("/captcha/sent", &[("phone", phone.as_str())])
                    .await?;
                Ok(if status.code == 200 { "captcha sent" } else { "send failed" }.to_string())
            }
            [phone, captcha] => {
                let params = [("phone", phone.as_str()), ("captcha", captcha.as_str())];
                let status: CodeCookie = self.client().get_json("/captcha/verify", &params).await?;
                if status.code != 200 {
                    return Ok("wrong captcha".to_string());
                }

                let status: CodeCookie = self.client().get_json("/login/cellphone", &params).await?;
                if status.code != 200 {
                    return Ok("login failed".to_string());
                }
                let cookie = utils::process_cookie(status.cookie.as_deref().unwrap_or_default());
                self.session.set_cookie(cookie).await?;
                Ok("login success".to_string())
            }
            _ => Ok(SMS_USAGE.to_string()),
        }
    }

    async fn login_cookie(&self, args: &[String]) -> ApiResult<String> {
        let cookie = args.join(" ");
        if cookie.trim().is_empty() {
            return Ok(COOKIE_USAGE.to_string());
        }
        self.session.set_cookie(cookie).await?;
        Ok("cookie set".to_string())
    }

    pub(super) async fn current_user(&self) -> ApiResult<Option<UserInfo>> {
        if self.session.snapshot().await.cookie().is_empty() {
            return Ok(None);
        }

        let status: LoginStatusResponse = self.client().get_json("/login/status", &[]).await?;
        let Some(data) = status.data else {
            return Ok(None);
        };
        let Some(account) = data.account else {
            return Ok(None);
        };
        if data.code != 200 && account.status != 0 {
            return Ok(None);
        }
        let Some(profile) = data.profile else {
            return Ok(None);
        };

        let vip: VipInfoResponse = self.client().get_json("/vip/info", &[]).await?;
        Ok(Some(UserInfo {
            id: profile.user_id.to_string(),
            name: profile.nickname,
            url: format!("https://music.163.com/#/user/home?id={}", profile.user_id),
            extra: vip_status(&vip, utils::timestamp_ms()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::netease::models::VipInfo;

    const NOW: i64 = 1_700_000_000_000;

    fn tier(expire_time: i64, vip_level: i64) -> Option<VipTier> {
        Some(VipTier {
            expire_time,
            vip_level,
        })
    }

    #[test]
    fn svip_wins_over_lower_tiers() {
        let vip = VipInfoResponse {
            code: 200,
            data: Some(VipInfo {
                redplus: tier(NOW + 1_000, 0),
                red_vip_level: 7,
                associator: tier(NOW + 1_000, 5),
                music_package: None,
                red_vip_annual_count: 1,
            }),
        };
        let text = vip_status(&vip, NOW);
        assert!(text.starts_with("annual SVIP level 7 expires "), "{}", text);
    }

    #[test]
    fn expired_tiers_fall_through() {
        let vip = VipInfoResponse {
            code: 200,
            data: Some(VipInfo {
                redplus: tier(NOW - 1, 0),
                associator: tier(NOW - 1, 5),
                music_package: tier(NOW + 1, 2),
                ..Default::default()
            }),
        };
        assert!(vip_status(&vip, NOW).starts_with("non-annual music package level 2 expires "));
    }

    #[test]
    fn failed_lookup_reads_as_no_vip() {
        let vip = VipInfoResponse { code: 301, data: None };
        assert_eq!(vip_status(&vip, NOW), "non-annual no VIP");
    }

    #[test]
    fn data_url_payload_is_decoded() {
        let bytes = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        assert!(decode_data_url("data:image/png;base64,***").is_err());
    }
}
