//! [`SqliteStore`] — the SQLite implementation of [`PolicyStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{ErrorCode, OptionalExtension as _};
use tracing::debug;
use uuid::Uuid;

use polis_core::{
  claim::{Claim, ClaimStatus, NewClaim, NewQuoteRequest, QuoteRequest, QuoteStatus},
  notification::{NewNotification, Notification},
  policy::{NewPolicy, Policy, PolicyPatch, PolicyType},
  settings::SystemSettings,
  store::{PolicyInsert, PolicyStore},
  user::{NewUser, Scope, UserAccount},
  validate::normalize_policy_number,
};

use crate::{
  Error, Result,
  encode::{
    CLAIM_COLUMNS, NOTIFICATION_COLUMNS, POLICY_COLUMNS, QUOTE_COLUMNS, RawClaim,
    RawNotification, RawPolicy, RawQuote, RawUser, USER_COLUMNS, decode_policy_type,
    decode_uuid, encode_date, encode_decimal, encode_documents, encode_dt, encode_policy_type,
    encode_tag, encode_uuid,
  },
  schema::SCHEMA,
};

/// The current time at the precision stored in the database, so that a
/// returned record compares equal to its re-read copy.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(e, rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation)
}

// ─── Query filters ───────────────────────────────────────────────────────────

/// A `WHERE` clause under construction with numbered parameters.
#[derive(Default)]
struct Filter {
  conds: Vec<String>,
  args:  Vec<String>,
}

/// Which table a scope is applied to; each resolves company membership
/// differently.
#[derive(Clone, Copy)]
enum Scoped {
  Policies,
  Claims,
  Quotes,
}

impl Filter {
  /// Bind `arg` and return its placeholder number.
  fn bind(&mut self, arg: String) -> usize {
    self.args.push(arg);
    self.args.len()
  }

  fn scope(mut self, scope: &Scope, table: Scoped) -> Self {
    match scope {
      Scope::All => {}
      Scope::Own(id) => {
        let n = self.bind(encode_uuid(*id));
        self.conds.push(format!("user_id = ?{n}"));
      }
      Scope::Company(company) => {
        let n = self.bind(company.clone());
        let members = format!("user_id IN (SELECT user_id FROM users WHERE company_name = ?{n})");
        self.conds.push(match table {
          Scoped::Policies => format!("(company_name = ?{n} OR {members})"),
          Scoped::Claims => format!(
            "({members} OR policy_id IN (SELECT policy_id FROM policies WHERE company_name = ?{n}))"
          ),
          Scoped::Quotes => members,
        });
      }
    }
    self
  }

  fn eq(mut self, column: &str, value: String) -> Self {
    let n = self.bind(value);
    self.conds.push(format!("{column} = ?{n}"));
    self
  }

  fn where_clause(&self) -> String {
    if self.conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.conds.join(" AND "))
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Polis policy store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Whether settings have ever been saved. Used to seed them exactly once.
  pub async fn has_settings(&self) -> Result<bool> {
    let found = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row("SELECT 1 FROM settings WHERE settings_id = 1", [], |_| Ok(()))
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(found)
  }

  /// Run `sql` with positional `args` and map each row with `map`.
  async fn select<R: Send + 'static>(
    &self,
    sql: String,
    args: Vec<String>,
    map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
  ) -> Result<Vec<R>> {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args.iter()), map)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn select_policies(&self, filter: Filter) -> Result<Vec<Policy>> {
    let sql = format!(
      "SELECT {POLICY_COLUMNS} FROM policies {} ORDER BY created_at DESC, rowid DESC",
      filter.where_clause()
    );
    let raws = self.select(sql, filter.args, RawPolicy::from_row).await?;
    raws.into_iter().map(RawPolicy::into_policy).collect()
  }

  async fn select_claims(&self, filter: Filter) -> Result<Vec<Claim>> {
    let sql = format!(
      "SELECT {CLAIM_COLUMNS} FROM claims {} ORDER BY created_at DESC, rowid DESC",
      filter.where_clause()
    );
    let raws = self.select(sql, filter.args, RawClaim::from_row).await?;
    raws.into_iter().map(RawClaim::into_claim).collect()
  }

  async fn select_quotes(&self, filter: Filter) -> Result<Vec<QuoteRequest>> {
    let sql = format!(
      "SELECT {QUOTE_COLUMNS} FROM quotes {} ORDER BY created_at DESC, rowid DESC",
      filter.where_clause()
    );
    let raws = self.select(sql, filter.args, RawQuote::from_row).await?;
    raws.into_iter().map(RawQuote::into_quote).collect()
  }

  async fn select_notifications(&self, filter: Filter) -> Result<Vec<Notification>> {
    let sql = format!(
      "SELECT {NOTIFICATION_COLUMNS} FROM notifications {} ORDER BY created_at DESC, rowid DESC",
      filter.where_clause()
    );
    let raws = self.select(sql, filter.args, RawNotification::from_row).await?;
    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  /// Write every mutable column of `policy` back to its row. Returns `false`
  /// when the new number collides with another of the customer's policies.
  async fn write_policy(&self, policy: &Policy) -> Result<bool> {
    let id_str       = encode_uuid(policy.id);
    let number       = policy.policy_number.clone();
    let insurer      = policy.insurer.clone();
    let premium      = encode_decimal(policy.premium_amount);
    let start        = policy.policy_start_date.map(encode_date);
    let end          = policy.policy_end_date.map(encode_date);
    let company      = policy.company_name.clone();
    let documents    = encode_documents(&policy.documents)?;
    let details_json = policy.details.to_json()?.to_string();
    let updated_at   = encode_dt(policy.updated_at);

    let written = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "UPDATE policies SET
             policy_number = ?2, insurer = ?3, premium_amount = ?4,
             start_date = ?5, end_date = ?6, company_name = ?7,
             documents = ?8, details_json = ?9, updated_at = ?10
           WHERE policy_id = ?1",
          rusqlite::params![
            id_str, number, insurer, premium, start, end, company, documents, details_json,
            updated_at,
          ],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    Ok(written)
  }

  async fn get_quote(&self, id: Uuid) -> Result<Option<QuoteRequest>> {
    let filter = Filter::default().eq("quote_id", encode_uuid(id));
    Ok(self.select_quotes(filter).await?.into_iter().next())
  }

  async fn get_notification(&self, user_id: Uuid, id: Uuid) -> Result<Option<Notification>> {
    let filter = Filter::default()
      .eq("notification_id", encode_uuid(id))
      .eq("user_id", encode_uuid(user_id));
    Ok(self.select_notifications(filter).await?.into_iter().next())
  }
}

// ─── PolicyStore impl ────────────────────────────────────────────────────────

impl PolicyStore for SqliteStore {
  type Error = Error;

  // ── Policies ──────────────────────────────────────────────────────────────

  async fn insert_policy(&self, input: NewPolicy) -> Result<PolicyInsert> {
    let now = now();
    let policy = Policy {
      id:                     Uuid::new_v4(),
      user_id:                input.user_id,
      policy_number:          normalize_policy_number(&input.policy_number),
      insurer:                input.insurer,
      premium_amount:         input.premium_amount,
      policy_start_date:      input.policy_start_date,
      policy_end_date:        input.policy_end_date,
      company_name:           input.company_name,
      documents:              input.documents,
      renewed_from_policy_id: input.renewed_from_policy_id,
      previous_policy_number: input.previous_policy_number,
      created_at:             now,
      updated_at:             now,
      details:                input.details,
    };

    let id_str       = encode_uuid(policy.id);
    let user_str     = encode_uuid(policy.user_id);
    let type_str     = encode_policy_type(policy.policy_type());
    let number       = policy.policy_number.clone();
    let insurer      = policy.insurer.clone();
    let premium      = encode_decimal(policy.premium_amount);
    let start        = policy.policy_start_date.map(encode_date);
    let end          = policy.policy_end_date.map(encode_date);
    let company      = policy.company_name.clone();
    let documents    = encode_documents(&policy.documents)?;
    let renewed_from = policy.renewed_from_policy_id.map(encode_uuid);
    let previous     = policy.previous_policy_number.clone();
    let details_json = policy.details.to_json()?.to_string();
    let at_str       = encode_dt(now);

    // `Some((type, id))` names the policy already holding the number.
    let holder: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        let find_holder = |tx: &rusqlite::Transaction<'_>| {
          tx.query_row(
            "SELECT policy_type, policy_id FROM policies
             WHERE user_id = ?1 AND policy_number = ?2",
            rusqlite::params![user_str, number],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
          )
          .optional()
        };

        let tx = conn.transaction()?;
        if let Some(holder) = find_holder(&tx)? {
          return Ok(Some(holder));
        }

        let res = tx.execute(
          "INSERT INTO policies (
             policy_id, user_id, policy_type, policy_number, insurer,
             premium_amount, start_date, end_date, company_name, documents,
             renewed_from_policy_id, previous_policy_number, details_json,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
          rusqlite::params![
            id_str,
            user_str,
            type_str,
            number,
            insurer,
            premium,
            start,
            end,
            company,
            documents,
            renewed_from,
            previous,
            details_json,
            at_str,
          ],
        );
        match res {
          Ok(_) => {}
          Err(e) if is_constraint_violation(&e) => {
            // Lost a race with a concurrent writer on another connection.
            return match find_holder(&tx)? {
              Some(holder) => Ok(Some(holder)),
              None => Err(e.into()),
            };
          }
          Err(e) => return Err(e.into()),
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match holder {
      Some((type_str, id_str)) => {
        let policy_type = decode_policy_type(&type_str)?;
        let policy_id = decode_uuid(&id_str)?;
        debug!(%policy_id, %policy_type, "insert rejected by uniqueness guard");
        Ok(PolicyInsert::Duplicate { policy_type, policy_id })
      }
      None => Ok(PolicyInsert::Inserted(policy)),
    }
  }

  async fn get_policy(&self, id: Uuid) -> Result<Option<Policy>> {
    let filter = Filter::default().eq("policy_id", encode_uuid(id));
    Ok(self.select_policies(filter).await?.into_iter().next())
  }

  async fn find_policy_by_number(
    &self,
    user_id: Uuid,
    policy_type: PolicyType,
    policy_number: &str,
  ) -> Result<Option<Policy>> {
    let filter = Filter::default()
      .eq("user_id", encode_uuid(user_id))
      .eq("policy_type", encode_policy_type(policy_type).to_owned())
      .eq("policy_number", normalize_policy_number(policy_number));
    Ok(self.select_policies(filter).await?.into_iter().next())
  }

  async fn find_renewal_of(&self, source_id: Uuid) -> Result<Option<Policy>> {
    let filter = Filter::default().eq("renewed_from_policy_id", encode_uuid(source_id));
    Ok(self.select_policies(filter).await?.into_iter().next())
  }

  async fn list_policies(
    &self,
    scope: &Scope,
    policy_type: Option<PolicyType>,
  ) -> Result<Vec<Policy>> {
    let mut filter = Filter::default().scope(scope, Scoped::Policies);
    if let Some(t) = policy_type {
      filter = filter.eq("policy_type", encode_policy_type(t).to_owned());
    }
    self.select_policies(filter).await
  }

  async fn update_policy(&self, id: Uuid, patch: PolicyPatch) -> Result<Option<Policy>> {
    let Some(mut policy) = self.get_policy(id).await? else {
      return Ok(None);
    };
    if let Some(details) = &patch.details
      && details.policy_type() != policy.policy_type()
    {
      return Err(Error::PolicyTypeChange(id));
    }

    patch.apply_to(&mut policy);
    policy.policy_number = normalize_policy_number(&policy.policy_number);
    policy.updated_at = now();

    if !self.write_policy(&policy).await? {
      return Err(Error::PolicyNumberTaken(policy.policy_number));
    }
    Ok(Some(policy))
  }

  async fn delete_policy(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM policies WHERE policy_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Claims ────────────────────────────────────────────────────────────────

  async fn insert_claim(&self, input: NewClaim) -> Result<Claim> {
    let now = now();
    let claim = Claim {
      id:            Uuid::new_v4(),
      user_id:       input.user_id,
      policy_id:     input.policy_id,
      status:        ClaimStatus::New,
      incident_date: input.incident_date,
      description:   input.description,
      claim_amount:  input.claim_amount,
      documents:     input.documents,
      created_at:    now,
      updated_at:    now,
    };

    let id_str     = encode_uuid(claim.id);
    let user_str   = encode_uuid(claim.user_id);
    let policy_str = encode_uuid(claim.policy_id);
    let status     = encode_tag("claim status", &claim.status)?;
    let incident   = encode_date(claim.incident_date);
    let desc       = claim.description.clone();
    let amount     = claim.claim_amount.map(encode_decimal);
    let documents  = encode_documents(&claim.documents)?;
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO claims (
             claim_id, user_id, policy_id, status, incident_date,
             description, claim_amount, documents, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            id_str, user_str, policy_str, status, incident, desc, amount, documents, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(claim)
  }

  async fn get_claim(&self, id: Uuid) -> Result<Option<Claim>> {
    let filter = Filter::default().eq("claim_id", encode_uuid(id));
    Ok(self.select_claims(filter).await?.into_iter().next())
  }

  async fn list_claims(&self, scope: &Scope) -> Result<Vec<Claim>> {
    self
      .select_claims(Filter::default().scope(scope, Scoped::Claims))
      .await
  }

  async fn set_claim_status(&self, id: Uuid, status: ClaimStatus) -> Result<Option<Claim>> {
    let id_str = encode_uuid(id);
    let status = encode_tag("claim status", &status)?;
    let at_str = encode_dt(now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE claims SET status = ?2, updated_at = ?3 WHERE claim_id = ?1",
          rusqlite::params![id_str, status, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_claim(id).await
  }

  // ── Quote requests ────────────────────────────────────────────────────────

  async fn insert_quote(&self, input: NewQuoteRequest) -> Result<QuoteRequest> {
    let quote = QuoteRequest {
      id:         Uuid::new_v4(),
      user_id:    input.user_id,
      lob:        input.lob,
      status:     QuoteStatus::New,
      details:    input.details,
      documents:  input.documents,
      created_at: now(),
    };

    let id_str    = encode_uuid(quote.id);
    let user_str  = encode_uuid(quote.user_id);
    let lob       = encode_tag("quote line", &quote.lob)?;
    let status    = encode_tag("quote status", &quote.status)?;
    let details   = quote.details.to_string();
    let documents = encode_documents(&quote.documents)?;
    let at_str    = encode_dt(quote.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO quotes (
             quote_id, user_id, lob, status, details_json, documents, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, user_str, lob, status, details, documents, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(quote)
  }

  async fn list_quotes(&self, scope: &Scope) -> Result<Vec<QuoteRequest>> {
    self
      .select_quotes(Filter::default().scope(scope, Scoped::Quotes))
      .await
  }

  async fn set_quote_status(
    &self,
    id: Uuid,
    status: QuoteStatus,
  ) -> Result<Option<QuoteRequest>> {
    let id_str = encode_uuid(id);
    let status = encode_tag("quote status", &status)?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE quotes SET status = ?2 WHERE quote_id = ?1",
          rusqlite::params![id_str, status],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_quote(id).await
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn insert_notification(&self, input: NewNotification) -> Result<Notification> {
    let notification = Notification {
      id:         Uuid::new_v4(),
      user_id:    input.user_id,
      kind:       input.kind,
      title:      input.title,
      message:    input.message,
      is_read:    false,
      metadata:   input.metadata,
      created_at: now(),
    };

    let id_str   = encode_uuid(notification.id);
    let user_str = encode_uuid(notification.user_id);
    let kind: &'static str = notification.kind.into();
    let title    = notification.title.clone();
    let message  = notification.message.clone();
    let metadata = notification
      .metadata
      .as_ref()
      .map(serde_json::to_string)
      .transpose()?;
    let at_str   = encode_dt(notification.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, user_id, kind, title, message, is_read, metadata, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
          rusqlite::params![id_str, user_str, kind, title, message, metadata, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(notification)
  }

  async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
    self
      .select_notifications(Filter::default().eq("user_id", encode_uuid(user_id)))
      .await
  }

  async fn mark_notification_read(
    &self,
    user_id: Uuid,
    id: Uuid,
  ) -> Result<Option<Notification>> {
    let id_str   = encode_uuid(id);
    let user_str = encode_uuid(user_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE notifications SET is_read = 1
           WHERE notification_id = ?1 AND user_id = ?2",
          rusqlite::params![id_str, user_str],
        )?;
        Ok(())
      })
      .await?;

    self.get_notification(user_id, id).await
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<UserAccount> {
    let account = UserAccount {
      user:          polis_core::user::CurrentUser {
        id:           Uuid::new_v4(),
        email:        input.email.trim().to_owned(),
        role:         input.role,
        company_name: input.company_name,
      },
      password_hash: input.password_hash,
      created_at:    now(),
    };

    let id_str  = encode_uuid(account.user.id);
    let email   = account.user.email.clone();
    let role    = encode_tag("role", &account.user.role)?;
    let company = account.user.company_name.clone();
    let hash    = account.password_hash.clone();
    let at_str  = encode_dt(account.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (user_id, email, role, company_name, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, email, role, company, hash, at_str],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::EmailTaken(account.user.email));
    }
    Ok(account)
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    let raws = self
      .select(sql, vec![email.trim().to_owned()], RawUser::from_row)
      .await?;
    raws.into_iter().next().map(RawUser::into_account).transpose()
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn get_settings(&self) -> Result<SystemSettings> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT value_json FROM settings WHERE settings_id = 1",
              [],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(json) => Ok(serde_json::from_str(&json)?),
      None => Ok(SystemSettings::default()),
    }
  }

  async fn put_settings(&self, settings: SystemSettings) -> Result<()> {
    let json = serde_json::to_string(&settings)?;
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO settings (settings_id, value_json) VALUES (1, ?1)
           ON CONFLICT (settings_id) DO UPDATE SET value_json = excluded.value_json",
          rusqlite::params![json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
