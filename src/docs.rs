use crate::api::allowance::{AllowanceFilter, CreateAllowance};
use crate::api::ctc::MonthQuery;
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::api::financial::{AttachmentUpload, ReviewPayload, VoucherPayload};
use crate::api::leave::{CreateLeave, LeaveFilter};
use crate::api::ltc::{CreateLtc, LtcFilter};
use crate::api::salary::{CreateSalary, SalaryFilter};
use crate::api::travel::{CreateTravel, TravelFilter};
use crate::core::ctc::{CtcRow, LineItem};
use crate::core::ledger::{LeaveBalance, LeaveCategory};
use crate::model::employee::Employee;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Payroll API",
        version = "1.0.0",
        description = r#"
## HR & Payroll Backend

This API manages employee records, approvable requests and payroll
aggregation for an organization.

### 🔹 Key Features
- **Employee Management**
  - Create, update, list and view employee profiles with per-category leave balances
- **Leave Requests**
  - Apply for leave against a category, route to named approvers, approve/reject with ledger effects
- **Allowances & Fixed Allowances**
  - Submit per-month amounts (amounts accumulate on resubmission), approve/reject, voucher annotation
- **Travel Expenditure & LTC Claims**
  - Itemized expense claims with attachments and approval workflow
- **Salary & CTC**
  - Record salary structures and read month-wise / employee-wise cost-to-company figures

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Approvals for financial requests require an approval-capable role
(**Admin** or **Accounts**); leave approvals are restricted to the
approvers named on the request.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::leave::create_leave,
        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::review_leave,
        crate::api::leave::delete_leave,

        crate::api::allowance::create_allowance,
        crate::api::allowance::list_allowances,
        crate::api::allowance::get_allowance,
        crate::api::allowance::review_allowance,
        crate::api::allowance::annotate_allowance,
        crate::api::allowance::allowance_attachment,
        crate::api::allowance::delete_allowance,

        crate::api::allowance::create_fixed_allowance,
        crate::api::allowance::list_fixed_allowances,
        crate::api::allowance::get_fixed_allowance,
        crate::api::allowance::review_fixed_allowance,
        crate::api::allowance::annotate_fixed_allowance,
        crate::api::allowance::fixed_allowance_attachment,
        crate::api::allowance::delete_fixed_allowance,

        crate::api::travel::create_travel,
        crate::api::travel::list_travel,
        crate::api::travel::get_travel,
        crate::api::travel::review_travel,
        crate::api::travel::annotate_travel,
        crate::api::travel::travel_attachment,
        crate::api::travel::delete_travel,

        crate::api::ltc::create_ltc,
        crate::api::ltc::list_ltc,
        crate::api::ltc::get_ltc,
        crate::api::ltc::review_ltc,
        crate::api::ltc::annotate_ltc,
        crate::api::ltc::ltc_attachment,
        crate::api::ltc::delete_ltc,

        crate::api::salary::create_salary,
        crate::api::salary::list_salaries,

        crate::api::ctc::month_wise_ctc,
        crate::api::ctc::employee_wise_ctc
    ),
    components(
        schemas(
            Employee,
            LeaveBalance,
            LeaveCategory,
            CreateEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            CreateLeave,
            LeaveFilter,
            CreateAllowance,
            AllowanceFilter,
            CreateTravel,
            TravelFilter,
            CreateLtc,
            LtcFilter,
            CreateSalary,
            SalaryFilter,
            MonthQuery,
            CtcRow,
            LineItem,
            ReviewPayload,
            VoucherPayload,
            AttachmentUpload
        )
    ),
    tags(
        (name = "Employee", description = "Employee management APIs"),
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "Allowance", description = "Variable allowance request APIs"),
        (name = "FixedAllowance", description = "Fixed allowance request APIs"),
        (name = "Travel", description = "Travel expenditure claim APIs"),
        (name = "LTC", description = "Leave travel concession claim APIs"),
        (name = "Salary", description = "Salary structure APIs"),
        (name = "CTC", description = "Cost-to-company reporting APIs"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
