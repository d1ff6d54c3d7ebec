// Copyright 2023 subregsim authors
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use subregsim_macros::api_errors;

api_errors! {
    /// Business-rule failures reported through the error envelope.
    ///
    /// Codes and messages match the ones the real Subreg.cz service returns.
    pub enum ApiError {
        /// Login with a wrong user name or password.
        AuthError => (500, 104, "Incorrect login or password"),
        /// Missing, stale or unknown session id.
        NotLogged => (500, 101, "You are not logged"),
        InvalidDomain => (524, 1009, "Invalid domain"),
        UnknownRecordType => (524, 1007, "Unknown record type"),
        /// Record added without a name.
        InvalidRecordName => (524, 1006, "Invalid domain name in record"),
        DuplicateCname => (524, 1008, "Cannot create CNAME, where another record already exists"),
        MissingRecordId => (524, 1002, "Missing or empty value for record ID"),
        RecordNotFound => (524, 1003, "Record does not exist"),
    }
}
