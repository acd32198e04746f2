use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::config::AppConfig;
use crate::users::repo::User;

pub const USER_ID_COOKIE: &str = "user_id";
pub const USERNAME_COOKIE: &str = "username";

/// Sessions live entirely in the two cookies below; the server keeps no
/// session table. Expiry is enforced by Max-Age on the client side.
pub const SESSION_TTL: Duration = Duration::days(7);

/// Attach session cookies for `user` to the outgoing jar.
pub fn issue(jar: CookieJar, user: &User, config: &AppConfig) -> CookieJar {
    jar.add(session_cookie(USER_ID_COOKIE, user.id.to_string(), config))
        .add(session_cookie(USERNAME_COOKIE, user.username.clone(), config))
}

/// Removal cookies for logout.
pub fn clear(jar: CookieJar) -> CookieJar {
    jar.remove(scoped(USER_ID_COOKIE)).remove(scoped(USERNAME_COOKIE))
}

fn session_cookie(name: &'static str, value: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(config.is_production())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(SESSION_TTL)
        .build()
}

// Removal must match the name and path the cookie was issued with.
fn scoped(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::Role;
    use time::OffsetDateTime;

    fn dev_config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/test".into(),
            environment: "development".into(),
            webhook_secret: "demo-secret".into(),
        }
    }

    fn user() -> User {
        User {
            id: 42,
            email: "a@x.com".into(),
            password_hash: None,
            username: "a".into(),
            phone: None,
            location: None,
            role: Role::User,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn issue_sets_both_cookies_with_session_attributes() {
        let jar = issue(CookieJar::new(), &user(), &dev_config());

        let id = jar.get(USER_ID_COOKIE).expect("user_id cookie");
        assert_eq!(id.value(), "42");
        assert_eq!(id.http_only(), Some(true));
        assert_eq!(id.same_site(), Some(SameSite::Lax));
        assert_eq!(id.path(), Some("/"));
        assert_eq!(id.max_age(), Some(Duration::days(7)));
        assert_ne!(id.secure(), Some(true));

        let name = jar.get(USERNAME_COOKIE).expect("username cookie");
        assert_eq!(name.value(), "a");
    }

    #[test]
    fn secure_flag_follows_environment() {
        let mut config = dev_config();
        config.environment = "production".into();
        let jar = issue(CookieJar::new(), &user(), &config);
        assert_eq!(jar.get(USER_ID_COOKIE).unwrap().secure(), Some(true));
    }

    #[test]
    fn clear_drops_both_cookies_from_the_jar() {
        let jar = issue(CookieJar::new(), &user(), &dev_config());
        let jar = clear(jar);
        assert!(jar.get(USER_ID_COOKIE).is_none());
        assert!(jar.get(USERNAME_COOKIE).is_none());
    }
}
