//! Database service for reservation-service.

use crate::models::{
    Client, CreateClient, CreateInvoice, CreateMovement, CreatePayment, CreateReservation,
    CreateUser, GuestRecord, Invoice, InvoiceStatus, LedgerTotals, Movement, MovementKind,
    CreateRoom, OccupancyRecord, Payment, Reservation, ReservationStatus, Role, Room, RoomStatus,
    UpdateClient, UpdateReservation, UpdateRoom, UpdateUser, User,
};
use crate::services::metrics::{DB_QUERY_DURATION, ERRORS_TOTAL, RESERVATIONS_CREATED};
use crate::services::reports::{DateRange, GuestFilter, OccupancyFilter};
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Map a store failure, counting it for alerting. The detail is logged when
/// the error is rendered; the response body stays generic.
fn store_error(context: &'static str, e: sqlx::Error) -> AppError {
    ERRORS_TOTAL.with_label_values(&["db_error"]).inc();
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "reservation-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Health check failed", e))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    /// Create a new client.
    #[instrument(skip(self, input), fields(document_id = %input.document_id))]
    pub async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (name, document_id, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, document_id, email, phone
            "#,
        )
        .bind(&input.name)
        .bind(&input.document_id)
        .bind(&input.email)
        .bind(&input.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Client with document '{}' already exists",
                    input.document_id
                ))
            }
            other => store_error("Failed to create client", other),
        })?;

        timer.observe_duration();

        info!(client_id = client.id, "Client created");

        Ok(client)
    }

    /// Get a client by ID.
    #[instrument(skip(self))]
    pub async fn get_client(&self, client_id: i32) -> Result<Option<Client>, AppError> {
        sqlx::query_as::<_, Client>(
            "SELECT id, name, document_id, email, phone FROM clients WHERE id = $1",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get client", e))
    }

    /// Look a client up by identity document.
    #[instrument(skip(self))]
    pub async fn get_client_by_document(
        &self,
        document_id: &str,
    ) -> Result<Option<Client>, AppError> {
        sqlx::query_as::<_, Client>(
            "SELECT id, name, document_id, email, phone FROM clients WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get client by document", e))
    }

    /// List all clients.
    #[instrument(skip(self))]
    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        sqlx::query_as::<_, Client>(
            "SELECT id, name, document_id, email, phone FROM clients ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list clients", e))
    }

    /// Update a client; absent fields keep their stored values.
    #[instrument(skip(self, input))]
    pub async fn update_client(
        &self,
        client_id: i32,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone)
            WHERE id = $1
            RETURNING id, name, document_id, email, phone
            "#,
        )
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to update client", e))
    }

    /// Delete a client. Returns false when no row matched.
    #[instrument(skip(self))]
    pub async fn delete_client(&self, client_id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(anyhow::anyhow!(
                        "Client {} still has reservations or invoices",
                        client_id
                    ))
                }
                other => store_error("Failed to delete client", other),
            })?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Room Operations
    // -------------------------------------------------------------------------

    /// Create a new room.
    #[instrument(skip(self, input), fields(number = %input.number))]
    pub async fn create_room(&self, input: &CreateRoom) -> Result<Room, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_room"])
            .start_timer();

        let status = input.status.unwrap_or(RoomStatus::Available);
        let room = sqlx::query_as::<_, Room>(
            r#"
            INSERT INTO rooms (number, room_type, price_per_night, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, number, room_type, price_per_night, status
            "#,
        )
        .bind(&input.number)
        .bind(&input.room_type)
        .bind(input.price_per_night)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Room '{}' already exists", input.number))
            }
            other => store_error("Failed to create room", other),
        })?;

        timer.observe_duration();

        info!(room_id = room.id, "Room created");

        Ok(room)
    }

    /// Get a room by ID.
    #[instrument(skip(self))]
    pub async fn get_room(&self, room_id: i32) -> Result<Option<Room>, AppError> {
        sqlx::query_as::<_, Room>(
            "SELECT id, number, room_type, price_per_night, status FROM rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get room", e))
    }

    /// List all rooms.
    #[instrument(skip(self))]
    pub async fn list_rooms(&self) -> Result<Vec<Room>, AppError> {
        sqlx::query_as::<_, Room>(
            "SELECT id, number, room_type, price_per_night, status FROM rooms ORDER BY number",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list rooms", e))
    }

    /// Update a room; absent fields keep their stored values.
    #[instrument(skip(self, input))]
    pub async fn update_room(
        &self,
        room_id: i32,
        input: &UpdateRoom,
    ) -> Result<Option<Room>, AppError> {
        sqlx::query_as::<_, Room>(
            r#"
            UPDATE rooms
            SET room_type = COALESCE($2, room_type),
                price_per_night = COALESCE($3, price_per_night),
                status = COALESCE($4, status)
            WHERE id = $1
            RETURNING id, number, room_type, price_per_night, status
            "#,
        )
        .bind(room_id)
        .bind(&input.room_type)
        .bind(input.price_per_night)
        .bind(input.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to update room", e))
    }

    /// Delete a room. Returns false when no row matched.
    #[instrument(skip(self))]
    pub async fn delete_room(&self, room_id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(anyhow::anyhow!(
                        "Room {} still has reservations",
                        room_id
                    ))
                }
                other => store_error("Failed to delete room", other),
            })?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Reservation Operations
    // -------------------------------------------------------------------------

    /// Create a reservation. Validates that the client and room exist and
    /// that the stay does not overlap an active reservation on the same room.
    #[instrument(skip(self, input), fields(client_id = input.client_id, room_id = input.room_id))]
    pub async fn create_reservation(
        &self,
        input: &CreateReservation,
    ) -> Result<Reservation, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_reservation"])
            .start_timer();

        if self.get_client(input.client_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Client {} not found",
                input.client_id
            )));
        }
        if self.get_room(input.room_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Room {} not found",
                input.room_id
            )));
        }

        // A stay [s2, e2] overlaps [s1, e1] when s1 <= e2 and e1 >= s2,
        // with a null end treated as unbounded.
        let overlaps: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM reservations
                WHERE room_id = $1
                  AND status IN ('pending', 'confirmed')
                  AND (end_date IS NULL OR end_date >= $2)
                  AND ($3::date IS NULL OR start_date <= $3)
            )
            "#,
        )
        .bind(input.room_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to check reservation overlap", e))?;

        if overlaps {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Room {} already has an active reservation in that window",
                input.room_id
            )));
        }

        let status = input.status.unwrap_or(ReservationStatus::Pending);
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (client_id, room_id, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, client_id, room_id, start_date, end_date, status, created_at
            "#,
        )
        .bind(input.client_id)
        .bind(input.room_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to create reservation", e))?;

        timer.observe_duration();

        RESERVATIONS_CREATED
            .with_label_values(&[status.as_str()])
            .inc();

        info!(
            reservation_id = reservation.id,
            status = %reservation.status,
            "Reservation created"
        );

        Ok(reservation)
    }

    /// Get a reservation by ID.
    #[instrument(skip(self))]
    pub async fn get_reservation(
        &self,
        reservation_id: i32,
    ) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, client_id, room_id, start_date, end_date, status, created_at
            FROM reservations
            WHERE id = $1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get reservation", e))
    }

    /// List reservations, most recent stay first.
    #[instrument(skip(self))]
    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, client_id, room_id, start_date, end_date, status, created_at
            FROM reservations
            ORDER BY start_date DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list reservations", e))
    }

    /// Update a reservation; absent fields keep their stored values.
    #[instrument(skip(self, input))]
    pub async fn update_reservation(
        &self,
        reservation_id: i32,
        input: &UpdateReservation,
    ) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET start_date = COALESCE($2, start_date),
                end_date = COALESCE($3, end_date),
                status = COALESCE($4, status)
            WHERE id = $1
            RETURNING id, client_id, room_id, start_date, end_date, status, created_at
            "#,
        )
        .bind(reservation_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
                AppError::BadRequest(anyhow::anyhow!(
                    "Updated dates would leave the stay ending before it starts"
                ))
            }
            other => store_error("Failed to update reservation", other),
        })
    }

    /// Delete a reservation. Returns false when no row matched.
    #[instrument(skip(self))]
    pub async fn delete_reservation(&self, reservation_id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(reservation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(anyhow::anyhow!(
                        "Reservation {} has invoices and cannot be deleted",
                        reservation_id
                    ))
                }
                other => store_error("Failed to delete reservation", other),
            })?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // User Operations
    // -------------------------------------------------------------------------

    /// Create a staff user with an already-hashed password.
    #[instrument(skip(self, input, password_hash), fields(email = %input.email))]
    pub async fn create_user(
        &self,
        input: &CreateUser,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, role_id
            "#,
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(password_hash)
        .bind(input.role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "User with email '{}' already exists",
                    input.email
                ))
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Role {} does not exist", input.role_id))
            }
            other => store_error("Failed to create user", other),
        })?;

        info!(user_id = user.id, "User created");

        Ok(user)
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: i32) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get user", e))
    }

    /// Look a user up by email for login and uniqueness checks.
    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role_id FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get user by email", e))
    }

    /// List all users.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role_id FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list users", e))
    }

    /// Update a user; a None password hash leaves the stored hash unchanged.
    #[instrument(skip(self, input, password_hash))]
    pub async fn update_user(
        &self,
        user_id: i32,
        input: &UpdateUser,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                role_id = COALESCE($5, role_id)
            WHERE id = $1
            RETURNING id, name, email, password_hash, role_id
            "#,
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(password_hash)
        .bind(input.role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("That email is already in use"))
            }
            other => store_error("Failed to update user", other),
        })
    }

    /// Delete a user. Returns false when no row matched.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to delete user", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// List the available roles.
    #[instrument(skip(self))]
    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to list roles", e))
    }

    // -------------------------------------------------------------------------
    // Ledger Operations
    // -------------------------------------------------------------------------

    /// Record a ledger movement of the given kind.
    #[instrument(skip(self, input), fields(kind = %kind, amount = %input.amount))]
    pub async fn record_movement(
        &self,
        kind: MovementKind,
        input: &CreateMovement,
    ) -> Result<Movement, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_movement"])
            .start_timer();

        let movement = sqlx::query_as::<_, Movement>(
            r#"
            INSERT INTO movements (date, kind, description, amount)
            VALUES ($1, $2, $3, $4)
            RETURNING id, date, kind, description, amount
            "#,
        )
        .bind(input.date)
        .bind(kind.as_str())
        .bind(&input.description)
        .bind(input.amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Movement amount cannot be negative"))
            }
            other => store_error("Failed to record movement", other),
        })?;

        timer.observe_duration();

        info!(movement_id = movement.id, kind = %kind, "Movement recorded");

        Ok(movement)
    }

    /// Get a movement of the given kind by ID.
    #[instrument(skip(self))]
    pub async fn get_movement(
        &self,
        movement_id: i32,
        kind: MovementKind,
    ) -> Result<Option<Movement>, AppError> {
        sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, date, kind, description, amount
            FROM movements
            WHERE id = $1 AND kind = $2
            "#,
        )
        .bind(movement_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get movement", e))
    }

    /// Delete a movement of the given kind. Returns false when no row matched.
    #[instrument(skip(self))]
    pub async fn delete_movement(
        &self,
        movement_id: i32,
        kind: MovementKind,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM movements WHERE id = $1 AND kind = $2")
            .bind(movement_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to delete movement", e))?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Report Queries
    // -------------------------------------------------------------------------

    /// Fetch ledger movements, optionally windowed and filtered by kind,
    /// most recent first. Absent filters match all rows.
    #[instrument(skip(self))]
    pub async fn fetch_movements(
        &self,
        range: &DateRange,
        kind: Option<MovementKind>,
    ) -> Result<Vec<Movement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_movements"])
            .start_timer();

        let movements = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, date, kind, description, amount
            FROM movements
            WHERE ($1::date IS NULL OR date >= $1)
              AND ($2::date IS NULL OR date <= $2)
              AND ($3::varchar IS NULL OR kind = $3)
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch movements", e))?;

        timer.observe_duration();

        Ok(movements)
    }

    /// Most recent movements of one kind inside the window.
    #[instrument(skip(self))]
    pub async fn recent_movements(
        &self,
        kind: MovementKind,
        range: &DateRange,
        limit: i64,
    ) -> Result<Vec<Movement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recent_movements"])
            .start_timer();

        let movements = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, date, kind, description, amount
            FROM movements
            WHERE kind = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(kind.as_str())
        .bind(range.start)
        .bind(range.end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch recent movements", e))?;

        timer.observe_duration();

        Ok(movements)
    }

    /// Ledger totals and counts per kind for the window, in one query.
    #[instrument(skip(self))]
    pub async fn ledger_totals(&self, range: &DateRange) -> Result<LedgerTotals, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["ledger_totals"])
            .start_timer();

        let totals = sqlx::query_as::<_, LedgerTotals>(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE kind = 'income'), 0) AS total_income,
                COUNT(*) FILTER (WHERE kind = 'income') AS income_count,
                COALESCE(SUM(amount) FILTER (WHERE kind = 'expense'), 0) AS total_expense,
                COUNT(*) FILTER (WHERE kind = 'expense') AS expense_count
            FROM movements
            WHERE ($1::date IS NULL OR date >= $1)
              AND ($2::date IS NULL OR date <= $2)
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to aggregate ledger totals", e))?;

        timer.observe_duration();

        Ok(totals)
    }

    /// Guest registry rows whose stay overlaps the window, newest stay first.
    #[instrument(skip(self, filter))]
    pub async fn fetch_guest_records(
        &self,
        filter: &GuestFilter,
    ) -> Result<Vec<GuestRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_guest_records"])
            .start_timer();

        let records = sqlx::query_as::<_, GuestRecord>(
            r#"
            SELECT client, document_id, email, phone, start_date, end_date,
                   room, room_type, reservation_status
            FROM guest_registry
            WHERE ($1::date IS NULL OR end_date IS NULL OR end_date >= $1)
              AND ($2::date IS NULL OR start_date <= $2)
              AND ($3::varchar IS NULL OR document_id = $3)
              AND ($4::varchar IS NULL OR client ILIKE '%' || $4 || '%')
            ORDER BY start_date DESC
            "#,
        )
        .bind(filter.range.start)
        .bind(filter.range.end)
        .bind(filter.document_id.as_deref())
        .bind(filter.client_name.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch guest registry", e))?;

        timer.observe_duration();

        Ok(records)
    }

    /// Room occupancy rows whose stay overlaps the window, newest stay first.
    #[instrument(skip(self, filter))]
    pub async fn fetch_occupancy_records(
        &self,
        filter: &OccupancyFilter,
    ) -> Result<Vec<OccupancyRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_occupancy_records"])
            .start_timer();

        let records = sqlx::query_as::<_, OccupancyRecord>(
            r#"
            SELECT room, room_type, start_date, end_date, reservation_status, client
            FROM room_occupancy
            WHERE ($1::date IS NULL OR end_date IS NULL OR end_date >= $1)
              AND ($2::date IS NULL OR start_date <= $2)
              AND ($3::varchar IS NULL OR room = $3)
              AND ($4::varchar IS NULL OR room_type = $4)
            ORDER BY start_date DESC
            "#,
        )
        .bind(filter.range.start)
        .bind(filter.range.end)
        .bind(filter.room_number.as_deref())
        .bind(filter.room_type.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch room occupancy", e))?;

        timer.observe_duration();

        Ok(records)
    }

    // -------------------------------------------------------------------------
    // Invoice and Payment Operations
    // -------------------------------------------------------------------------

    /// Issue an invoice for a reservation. The client is taken from the
    /// reservation itself.
    #[instrument(skip(self, input), fields(reservation_id = input.reservation_id))]
    pub async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let reservation = self
            .get_reservation(input.reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Reservation {} not found",
                    input.reservation_id
                ))
            })?;

        let issued_date = input
            .issued_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (reservation_id, client_id, issued_date, total, status)
            VALUES ($1, $2, $3, $4, 'issued')
            RETURNING id, reservation_id, client_id, issued_date, total, status
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.client_id)
        .bind(issued_date)
        .bind(input.total)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Invoice total cannot be negative"))
            }
            other => store_error("Failed to create invoice", other),
        })?;

        timer.observe_duration();

        info!(invoice_id = invoice.id, total = %invoice.total, "Invoice issued");

        Ok(invoice)
    }

    /// Get an invoice by ID.
    #[instrument(skip(self))]
    pub async fn get_invoice(&self, invoice_id: i32) -> Result<Option<Invoice>, AppError> {
        sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, reservation_id, client_id, issued_date, total, status
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get invoice", e))
    }

    /// List invoices, most recent first.
    #[instrument(skip(self))]
    pub async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, reservation_id, client_id, issued_date, total, status
            FROM invoices
            ORDER BY issued_date DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list invoices", e))
    }

    /// Void an issued invoice. Paid invoices cannot be voided.
    #[instrument(skip(self))]
    pub async fn void_invoice(&self, invoice_id: i32) -> Result<Invoice, AppError> {
        let invoice = self.get_invoice(invoice_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
        })?;

        match invoice.status {
            InvoiceStatus::Paid => Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice {} is already paid and cannot be voided",
                invoice_id
            ))),
            InvoiceStatus::Void => Ok(invoice),
            InvoiceStatus::Issued => {
                let voided = sqlx::query_as::<_, Invoice>(
                    r#"
                    UPDATE invoices
                    SET status = 'void'
                    WHERE id = $1
                    RETURNING id, reservation_id, client_id, issued_date, total, status
                    "#,
                )
                .bind(invoice_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| store_error("Failed to void invoice", e))?;

                info!(invoice_id = voided.id, "Invoice voided");

                Ok(voided)
            }
        }
    }

    /// Register a payment against an invoice. Rejects payments on void
    /// invoices and payments beyond the outstanding balance; flips the
    /// invoice to paid when covered, and records the matching income
    /// movement, all in one transaction.
    #[instrument(skip(self, input), fields(invoice_id = input.invoice_id, amount = %input.amount))]
    pub async fn record_payment(
        &self,
        input: &CreatePayment,
    ) -> Result<(Payment, Invoice), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        if input.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment amount must be positive"
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction", e))?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, reservation_id, client_id, issued_date, total, status
            FROM invoices
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(input.invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to lock invoice", e))?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Invoice {} not found", input.invoice_id))
        })?;

        if invoice.status == InvoiceStatus::Void {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice {} is void and cannot receive payments",
                invoice.id
            )));
        }

        let already_paid: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = $1",
        )
        .bind(invoice.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to sum payments", e))?;

        let outstanding = invoice.total - already_paid;
        if input.amount > outstanding {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment of {} exceeds outstanding balance {}",
                input.amount,
                outstanding
            )));
        }

        let paid_date = input.paid_date.unwrap_or_else(|| Utc::now().date_naive());

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (invoice_id, paid_date, amount, method)
            VALUES ($1, $2, $3, $4)
            RETURNING id, invoice_id, paid_date, amount, method
            "#,
        )
        .bind(invoice.id)
        .bind(paid_date)
        .bind(input.amount)
        .bind(input.method.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to insert payment", e))?;

        let fully_paid = already_paid + input.amount >= invoice.total;
        let invoice = if fully_paid {
            sqlx::query_as::<_, Invoice>(
                r#"
                UPDATE invoices
                SET status = 'paid'
                WHERE id = $1
                RETURNING id, reservation_id, client_id, issued_date, total, status
                "#,
            )
            .bind(invoice.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| store_error("Failed to mark invoice paid", e))?
        } else {
            invoice
        };

        // Every payment shows up in the ledger as income.
        sqlx::query(
            r#"
            INSERT INTO movements (date, kind, description, amount)
            VALUES ($1, 'income', $2, $3)
            "#,
        )
        .bind(paid_date)
        .bind(format!("Payment for invoice {}", invoice.id))
        .bind(input.amount)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to record income movement", e))?;

        tx.commit()
            .await
            .map_err(|e| store_error("Failed to commit payment", e))?;

        timer.observe_duration();

        info!(
            payment_id = payment.id,
            invoice_id = invoice.id,
            fully_paid = fully_paid,
            "Payment registered"
        );

        Ok((payment, invoice))
    }

    /// List payments registered against an invoice.
    #[instrument(skip(self))]
    pub async fn list_payments(&self, invoice_id: i32) -> Result<Vec<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, invoice_id, paid_date, amount, method
            FROM payments
            WHERE invoice_id = $1
            ORDER BY paid_date DESC, id DESC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list payments", e))
    }
}
