use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;
use slotbook_core::{
    errors::BookingResult,
    models::{
        appointment::{Appointment, AppointmentStatus, NewAppointment, Rescheduled},
        school::School,
        template::WorkingHoursTemplate,
    },
    store::{BookingStore, SchoolDirectory},
};
use uuid::Uuid;

// Mock stores for driving the allocator through failure paths
mock! {
    pub BookingStore {}

    #[async_trait]
    impl BookingStore for BookingStore {
        async fn get_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>>;

        async fn list_appointments(
            &self,
            school_id: Uuid,
            date: NaiveDate,
        ) -> BookingResult<Vec<Appointment>>;

        async fn list_occupying(
            &self,
            school_id: Uuid,
            date: NaiveDate,
        ) -> BookingResult<Vec<Appointment>>;

        async fn insert_if_free(&self, booking: NewAppointment) -> BookingResult<Appointment>;

        async fn transition(&self, id: Uuid, to: AppointmentStatus) -> BookingResult<Appointment>;

        async fn reschedule(
            &self,
            id: Uuid,
            replacement: NewAppointment,
        ) -> BookingResult<Rescheduled>;
    }
}

mock! {
    pub SchoolDirectory {}

    #[async_trait]
    impl SchoolDirectory for SchoolDirectory {
        async fn find_school(&self, school_id: Uuid) -> BookingResult<Option<School>>;

        async fn find_template(
            &self,
            school_id: Uuid,
        ) -> BookingResult<Option<WorkingHoursTemplate>>;
    }
}
