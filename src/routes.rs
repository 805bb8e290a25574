use crate::{
    api::{attendance, qr},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    // The kiosk surfaces (face mark, QR redeem) are the exposed ones
    let mark_limiter = Arc::new(build_limiter(config.rate_mark_per_min));
    let qr_limiter = Arc::new(build_limiter(config.rate_qr_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/attendance")
                    // face-recognition channel
                    .service(
                        web::resource("/mark")
                            .wrap(mark_limiter.clone())
                            .route(web::post().to(attendance::mark_attendance)),
                    )
                    // manual channel + operator lists
                    .service(
                        web::resource("/check-in/list")
                            .route(web::get().to(attendance::check_in_list)),
                    )
                    .service(
                        web::resource("/check-in/{employee_id}")
                            .route(web::post().to(attendance::manual_check_in)),
                    )
                    .service(
                        web::resource("/check-out/list")
                            .route(web::get().to(attendance::pending_checkouts)),
                    )
                    .service(
                        web::resource("/check-out/{employee_id}")
                            .route(web::post().to(attendance::manual_check_out)),
                    )
                    .service(
                        web::resource("/status/{employee_id}")
                            .route(web::put().to(attendance::update_status)),
                    )
                    // read side
                    .service(
                        web::resource("/today/{employee_id}")
                            .route(web::get().to(attendance::today_status)),
                    )
                    .service(web::resource("/roster").route(web::get().to(attendance::roster)))
                    .service(
                        web::resource("/history/{employee_id}")
                            .route(web::get().to(attendance::history)),
                    )
                    .service(
                        web::resource("/summary")
                            .route(web::get().to(attendance::daily_summary)),
                    ),
            )
            .service(
                web::scope("/qr")
                    .service(web::resource("/generate").route(web::post().to(qr::generate)))
                    .service(
                        web::resource("/attendance")
                            .wrap(qr_limiter.clone())
                            .route(web::post().to(qr::redeem)),
                    ),
            ),
    );
}
