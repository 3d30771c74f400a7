use crate::{
    api::{attendance, face, holiday, session, stats, user},
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

    // The recognize endpoint is reachable without identity headers, so it
    // gets the tightest limit.
    let recognize_limiter = Arc::new(build_limiter(config.rate_recognize_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(protected_limiter)
            .service(
                web::scope("/face")
                    .service(
                        web::resource("/recognize")
                            .wrap(recognize_limiter)
                            .route(web::post().to(face::recognize)),
                    )
                    .service(
                        web::resource("/register/{user_id}")
                            .wrap(register_limiter.clone())
                            .route(web::post().to(face::register_face))
                            .route(web::delete().to(face::delete_encoding)),
                    )
                    .service(web::resource("/encodings").route(web::get().to(face::list_encodings)))
                    .service(web::resource("/logs").route(web::get().to(face::list_logs)))
                    .service(
                        web::resource("/stats").route(web::get().to(face::recognition_stats)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    // literal segments before /{id}
                    .service(web::resource("/stats").route(web::get().to(stats::attendance_stats)))
                    .service(
                        web::resource("/report").route(web::get().to(stats::attendance_report)),
                    )
                    .service(web::resource("").route(web::get().to(attendance::list_records)))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(attendance::get_record))
                            .route(web::put().to(attendance::update_record))
                            .route(web::delete().to(attendance::delete_record)),
                    ),
            )
            .service(
                web::scope("/users")
                    .service(
                        web::resource("")
                            .wrap(register_limiter)
                            .route(web::post().to(user::create_user))
                            .route(web::get().to(user::list_users)),
                    )
                    .service(web::resource("/me").route(web::get().to(user::me)))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(user::get_user))
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::get().to(holiday::list_holidays))
                            .route(web::post().to(holiday::create_holiday)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(holiday::update_holiday))
                            .route(web::delete().to(holiday::delete_holiday)),
                    ),
            )
            .service(
                web::scope("/sessions")
                    .service(
                        web::resource("")
                            .route(web::get().to(session::list_sessions))
                            .route(web::post().to(session::create_session)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(session::get_session))),
            ),
    );
}
